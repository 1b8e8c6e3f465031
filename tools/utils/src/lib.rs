//! 命令行工具依赖的通用组件.

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 初始化 `simple_logger`. `RUST_LOG` 非空时覆盖 `level`. 重复初始化时忽略错误.
pub fn init_logger(level: log::LevelFilter) {
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .without_timestamps()
        .init()
    {
        eprintln!("logger already initialised: {e}");
    }
}
