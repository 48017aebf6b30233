//! Dispatch Server - 按需服务订单派单编排器
//!
//! # 架构概述
//!
//! - **订单引擎** (`orders`): 生命周期、派单匹配、位置追踪
//! - **账本** (`ledger`): 嵌入式哈希链账本，写后队列异步记录快照
//! - **服务商目录** (`directory`): 查询可用服务商并推送派单通知
//! - **HTTP API** (`api`): RESTful 接口与 SSE 位置流
//!
//! # 模块结构
//!
//! ```text
//! dispatch-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单引擎与 redb 存储
//! ├── ledger/        # 哈希链账本、写后队列、链审计
//! ├── directory/     # 服务商目录 (HTTP / 内存)
//! └── utils/         # 错误类型、日志
//! ```

pub mod api;
pub mod core;
pub mod directory;
pub mod ledger;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use orders::{OrderStorage, OrdersManager};
pub use utils::{AppError, AppResult};

// Re-export 日志函数
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置环境：加载 .env 并初始化日志
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    )?;
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  _                  __       __
   / __ \(_)________  ____ _/ /______/ /_
  / / / / / ___/ __ \/ __ `/ __/ ___/ __ \
 / /_/ / (__  ) /_/ / /_/ / /_/ /__/ / / /
/_____/_/____/ .___/\__,_/\__/\___/_/ /_/
            /_/
    "#
    );
}
