//! # ServiceLocator：逻辑地址到物理端点的解析
//!
//! ## 核心意图（Why）
//! - 调用方只持有 {environment, service}，真正的 host:port 在每次调用时
//!   解析；强制主机模式让本地开发完全旁路真实发现；
//! - 发现结果按地址缓存一个 TTL（默认 5 秒），在“陈旧端点的暴露窗口”与
//!   “目录服务的查询压力”之间取一个已记录的折中。
//!
//! ## 行为契约（What）
//! - 强制主机优先级最高：任何地址（包括不存在的服务）都解析到该端点，
//!   发现与缓存均不参与；
//! - 发现失败不进缓存，下一次调用立即重查，故障恢复无额外延迟；
//! - TTL 为零关闭缓存，每次调用都触发目录查询。
//!
//! ## 并发与风险（Trade-offs）
//! - 缓存以 `parking_lot::Mutex` 保护，读写临界区都只做哈希表操作；
//! - 同一地址的并发未命中会各自发起目录查询（不做请求合并），以实现
//!   简单性换取极端场景下的少量重复查询。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use lever_core::address::{ResolvedEndpoint, ServiceAddress};

use crate::error::ResolveError;

/// 外部目录查询的契约（集群控制面在核心侧的唯一投影）。
///
/// # 教案式注释
/// - **意图 (Why)**：控制面如何把服务指派到主机不在本 crate 范围内；
///   调用核心只依赖“{环境, 服务} → 端点”这一条查询能力；
/// - **契约 (What)**：无指派必须返回
///   [`ResolveError::ServiceUnresolved`]，目录自身故障用
///   [`ResolveError::Directory`] 区分；
/// - **风险 (Trade-offs)**：trait 对象形态（`Arc<dyn Discovery>`）换取
///   测试中可注入假目录。
#[async_trait]
pub trait Discovery: Send + Sync + 'static {
    /// 查询地址当前指派的端点。
    async fn lookup(&self, address: &ServiceAddress) -> Result<ResolvedEndpoint, ResolveError>;
}

/// 进程内静态目录：开发与测试用的最小 [`Discovery`] 实现。
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    entries: DashMap<ServiceAddress, ResolvedEndpoint>,
}

impl StaticDiscovery {
    /// 创建空目录。
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或覆盖一条指派。
    pub fn assign(&self, address: ServiceAddress, endpoint: ResolvedEndpoint) {
        self.entries.insert(address, endpoint);
    }

    /// 撤销一条指派。
    pub fn withdraw(&self, address: &ServiceAddress) -> Option<ResolvedEndpoint> {
        self.entries.remove(address).map(|(_, endpoint)| endpoint)
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn lookup(&self, address: &ServiceAddress) -> Result<ResolvedEndpoint, ResolveError> {
        self.entries
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ResolveError::ServiceUnresolved {
                address: address.clone(),
            })
    }
}

struct CachedEndpoint {
    endpoint: ResolvedEndpoint,
    refreshed_at: Instant,
}

/// 带强制主机旁路与 TTL 缓存的解析器。
pub struct ServiceLocator {
    forced: Option<ResolvedEndpoint>,
    discovery: Option<Arc<dyn Discovery>>,
    ttl: Duration,
    cache: Mutex<HashMap<ServiceAddress, CachedEndpoint>>,
}

impl ServiceLocator {
    /// 组装解析器。
    ///
    /// # 契约说明（What）
    /// - `forced` 非空即进入强制主机模式，`discovery` 与 `ttl` 不再参与；
    /// - 发现模式下 `discovery` 缺失时，所有解析返回
    ///   [`ResolveError::NoDiscovery`]。
    pub fn new(
        forced: Option<ResolvedEndpoint>,
        discovery: Option<Arc<dyn Discovery>>,
        ttl: Duration,
    ) -> Self {
        Self {
            forced,
            discovery,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 当前的强制主机。
    pub fn forced_host(&self) -> Option<&ResolvedEndpoint> {
        self.forced.as_ref()
    }

    /// 解析逻辑地址。
    ///
    /// # 执行逻辑（How）
    /// 1. 强制主机命中即返回；
    /// 2. 查 TTL 缓存，过期条目顺手剔除；
    /// 3. 委托目录查询，成功结果回填缓存。
    pub async fn resolve(
        &self,
        address: &ServiceAddress,
    ) -> Result<ResolvedEndpoint, ResolveError> {
        if let Some(endpoint) = &self.forced {
            return Ok(endpoint.clone());
        }
        if let Some(endpoint) = self.cached(address) {
            return Ok(endpoint);
        }
        let discovery = self.discovery.as_deref().ok_or(ResolveError::NoDiscovery)?;
        let endpoint = discovery.lookup(address).await?;
        debug!(
            target: "lever::locator",
            %address,
            endpoint = %endpoint,
            "发现解析完成并写入缓存"
        );
        self.store(address, &endpoint);
        Ok(endpoint)
    }

    fn cached(&self, address: &ServiceAddress) -> Option<ResolvedEndpoint> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut cache = self.cache.lock();
        match cache.get(address) {
            Some(entry) if entry.refreshed_at.elapsed() < self.ttl => {
                Some(entry.endpoint.clone())
            }
            Some(_) => {
                cache.remove(address);
                None
            }
            None => None,
        }
    }

    fn store(&self, address: &ServiceAddress, endpoint: &ResolvedEndpoint) {
        if self.ttl.is_zero() {
            return;
        }
        self.cache.lock().insert(
            address.clone(),
            CachedEndpoint {
                endpoint: endpoint.clone(),
                refreshed_at: Instant::now(),
            },
        );
    }
}

impl std::fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("forced", &self.forced)
            .field("has_discovery", &self.discovery.is_some())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 统计查询次数的目录包装，用于断言缓存与旁路行为。
    struct CountingDiscovery {
        inner: StaticDiscovery,
        lookups: AtomicUsize,
    }

    impl CountingDiscovery {
        fn with_assignment(address: ServiceAddress, endpoint: ResolvedEndpoint) -> Arc<Self> {
            let inner = StaticDiscovery::new();
            inner.assign(address, endpoint);
            Arc::new(Self {
                inner,
                lookups: AtomicUsize::new(0),
            })
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Discovery for CountingDiscovery {
        async fn lookup(
            &self,
            address: &ServiceAddress,
        ) -> Result<ResolvedEndpoint, ResolveError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(address).await
        }
    }

    fn hello_address() -> ServiceAddress {
        ServiceAddress::new("dev.lever", "helloService")
    }

    /// 强制主机对任意地址（含不存在的服务）都无条件生效，发现不被触碰。
    #[tokio::test]
    async fn forced_host_wins_for_any_address() {
        let forced = ResolvedEndpoint::new("127.0.0.1", 9000);
        let discovery = CountingDiscovery::with_assignment(
            hello_address(),
            ResolvedEndpoint::new("10.0.0.1", 80),
        );
        let locator = ServiceLocator::new(
            Some(forced.clone()),
            Some(Arc::clone(&discovery) as Arc<dyn Discovery>),
            Duration::from_secs(5),
        );

        let resolved = locator.resolve(&hello_address()).await.expect("解析应成功");
        assert_eq!(resolved, forced, "已部署服务也应解析到强制主机");

        let ghost = ServiceAddress::new("prod.lever", "noSuchService");
        let resolved = locator.resolve(&ghost).await.expect("未部署服务同样生效");
        assert_eq!(resolved, forced);
        assert_eq!(discovery.lookups(), 0, "强制主机模式不得触碰发现");
    }

    /// TTL 内的重复解析命中缓存，过期后重新查询目录。
    #[tokio::test]
    async fn ttl_cache_bounds_directory_load() {
        let endpoint = ResolvedEndpoint::new("10.0.0.2", 8080);
        let discovery = CountingDiscovery::with_assignment(hello_address(), endpoint.clone());
        let locator = ServiceLocator::new(
            None,
            Some(Arc::clone(&discovery) as Arc<dyn Discovery>),
            Duration::from_millis(50),
        );

        for _ in 0..3 {
            let resolved = locator.resolve(&hello_address()).await.expect("解析应成功");
            assert_eq!(resolved, endpoint);
        }
        assert_eq!(discovery.lookups(), 1, "TTL 内应只查询一次目录");

        tokio::time::sleep(Duration::from_millis(80)).await;
        locator.resolve(&hello_address()).await.expect("过期后应重查");
        assert_eq!(discovery.lookups(), 2, "过期条目应触发第二次查询");
    }

    /// TTL 为零时关闭缓存，每次解析都落到目录。
    #[tokio::test]
    async fn zero_ttl_disables_the_cache() {
        let discovery = CountingDiscovery::with_assignment(
            hello_address(),
            ResolvedEndpoint::new("10.0.0.3", 8080),
        );
        let locator = ServiceLocator::new(
            None,
            Some(Arc::clone(&discovery) as Arc<dyn Discovery>),
            Duration::ZERO,
        );

        locator.resolve(&hello_address()).await.expect("解析应成功");
        locator.resolve(&hello_address()).await.expect("解析应成功");
        assert_eq!(discovery.lookups(), 2, "零 TTL 不得缓存");
    }

    /// 查询失败不进缓存：指派恢复后下一次解析立即成功。
    #[tokio::test]
    async fn failures_are_never_cached() {
        let discovery = Arc::new(CountingDiscovery {
            inner: StaticDiscovery::new(),
            lookups: AtomicUsize::new(0),
        });
        let locator = ServiceLocator::new(
            None,
            Some(Arc::clone(&discovery) as Arc<dyn Discovery>),
            Duration::from_secs(5),
        );

        let err = locator
            .resolve(&hello_address())
            .await
            .expect_err("无指派应解析失败");
        assert!(matches!(err, ResolveError::ServiceUnresolved { .. }));

        let endpoint = ResolvedEndpoint::new("10.0.0.4", 8080);
        discovery.inner.assign(hello_address(), endpoint.clone());
        let resolved = locator
            .resolve(&hello_address())
            .await
            .expect("指派恢复后应立即可解析");
        assert_eq!(resolved, endpoint);
    }

    /// 既无强制主机也无发现后端时，解析报 NoDiscovery。
    #[tokio::test]
    async fn missing_discovery_is_reported_distinctly() {
        let locator = ServiceLocator::new(None, None, Duration::from_secs(5));
        let err = locator
            .resolve(&hello_address())
            .await
            .expect_err("缺失发现应失败");
        assert_eq!(err, ResolveError::NoDiscovery);
    }
}
