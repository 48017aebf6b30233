use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::directory::{HttpProviderDirectory, MemoryDirectory, ProviderDirectory};
use crate::ledger::{HashChainLedger, LedgerAuditor, LedgerService, LedgerWorker};
use crate::orders::{LocationTracker, OrderStorage, OrdersManager};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | orders | OrdersManager | 订单生命周期引擎 |
/// | ledger | Arc<HashChainLedger> | 嵌入式哈希链账本 |
/// | streams | CancellationToken | 关闭所有 Track 流 |
/// | tasks | BackgroundTasks | 后台任务 (写后队列、链审计) |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub orders: OrdersManager,
    pub ledger: Arc<HashChainLedger>,
    streams: CancellationToken,
    tasks: Arc<Mutex<Option<BackgroundTasks>>>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("orders", &self.orders)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 订单存储 (work_dir/orders.redb)
    /// 3. 账本 (work_dir/ledger.redb)
    /// 4. 服务商目录 (HTTP 或内存)
    /// 5. 订单引擎与后台任务
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let storage = OrderStorage::open(config.orders_db_path())?;
        let ledger = Arc::new(HashChainLedger::open(config.ledger_db_path())?);
        let directory = Self::build_directory(config)?;

        if let Ok(stats) = storage.get_stats() {
            tracing::info!(
                orders = stats.order_count,
                locations = stats.location_count,
                "Order store opened"
            );
        }

        Ok(Self::assemble(config.clone(), storage, ledger, directory))
    }

    fn build_directory(config: &Config) -> Result<Arc<dyn ProviderDirectory>> {
        match config.provider_directory_url.as_deref() {
            Some(url) => {
                tracing::info!(url, "Using remote provider directory");
                Ok(Arc::new(HttpProviderDirectory::new(
                    url,
                    config.directory_timeout(),
                )?))
            }
            None => {
                tracing::warn!("PROVIDER_DIRECTORY_URL not set, using in-process provider directory");
                let directory = MemoryDirectory::new();
                match config.provider_seed_file.as_deref() {
                    Some(path) => {
                        directory.load_seed(path)?;
                    }
                    None => {
                        tracing::warn!("PROVIDER_SEED_FILE not set, in-process directory has no providers");
                    }
                }
                Ok(Arc::new(directory))
            }
        }
    }

    /// 组装订单引擎并启动后台任务
    ///
    /// 必须在 tokio 运行时内调用。
    pub(crate) fn assemble(
        config: Config,
        storage: OrderStorage,
        ledger: Arc<HashChainLedger>,
        directory: Arc<dyn ProviderDirectory>,
    ) -> Self {
        let mut tasks = BackgroundTasks::new();
        let streams = CancellationToken::new();

        let (ledger_service, ledger_rx) = LedgerService::new(config.ledger_queue_capacity);
        let worker = LedgerWorker::new(ledger.clone(), storage.clone());
        let token = tasks.shutdown_token();
        tasks.spawn("ledger_worker", TaskKind::Worker, worker.run(ledger_rx, token));

        if let Some(interval) = config.ledger_audit_interval() {
            let auditor = LedgerAuditor::new(ledger.clone(), interval, tasks.shutdown_token());
            tasks.spawn("ledger_auditor", TaskKind::Periodic, auditor.run());
        }
        tasks.log_summary();

        let tracker = LocationTracker::new(
            storage.clone(),
            config.track_poll_interval(),
            streams.clone(),
        );
        let orders = OrdersManager::new(storage, directory, ledger.clone(), ledger_service, tracker);

        Self {
            config,
            orders,
            ledger,
            streams,
            tasks: Arc::new(Mutex::new(Some(tasks))),
        }
    }

    pub fn orders(&self) -> &OrdersManager {
        &self.orders
    }

    /// 关闭所有 Track 流，使未完成的连接可以结束
    pub fn close_streams(&self) {
        self.streams.cancel();
    }

    /// 后台任务健康检查，返回异常任务数量
    pub fn check_tasks(&self) -> usize {
        self.tasks.lock().as_ref().map_or(0, |tasks| tasks.check_health())
    }

    /// 停止后台任务 (账本队列先排空)
    pub async fn shutdown(&self) {
        self.close_streams();
        let tasks = self.tasks.lock().take();
        if let Some(tasks) = tasks {
            tasks.shutdown(self.config.shutdown_timeout()).await;
        }
    }
}
