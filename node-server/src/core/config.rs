use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 对等节点选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerSelection {
    /// 在可达节点中均匀随机选择
    #[default]
    Random,
    /// 按可达节点顺序轮询
    RoundRobin,
}

impl FromStr for PeerSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            other => Err(format!("unknown peer selection policy: {other}")),
        }
    }
}

/// 节点配置 - 单个订单节点的所有配置项
///
/// 配置在启动时构造一次，之后以不可变方式注入各组件。
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | NODE_ID | nodo1 | 本节点标识 |
/// | HTTP_PORT | 5000 | HTTP 服务端口 |
/// | WORK_DIR | ./data | 工作目录 (数据库文件) |
/// | REPLICA_ENABLED | true | 是否启用复制 |
/// | REPLICA_NODES | http://localhost:5001,http://localhost:5002 | 对等节点列表 |
/// | PUBLIC_URL | - | 本节点对外地址 (从对等列表中剔除) |
/// | PROBE_TIMEOUT_MS | 3000 | 探活超时(毫秒) |
/// | REPLICATION_TIMEOUT_MS | 5000 | 推送超时(毫秒) |
/// | MAX_RETRIES | 3 | 最大重试次数 (保留，当前未使用) |
/// | REPLICATION_INTERVAL_SECS | 0 | 定时复制间隔，0 表示关闭 |
/// | PEER_SELECTION | random | random 或 round_robin |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志文件目录 |
///
/// # 示例
///
/// ```ignore
/// NODE_ID=nodo2 HTTP_PORT=5001 REPLICA_NODES=http://localhost:5000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 本节点标识，写入每条操作日志的 origin_node
    pub node_id: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 工作目录
    pub work_dir: String,
    /// 是否启用复制 (关闭时 append 不写日志，dispatch 被拒绝)
    pub replica_enabled: bool,
    /// 已去重、已剔除本节点 (PUBLIC_URL 及本端口的 localhost/127.0.0.1) 的对等节点 URL
    pub replica_nodes: Vec<String>,
    /// 本节点对外地址
    pub public_url: Option<String>,
    pub probe_timeout_ms: u64,
    pub replication_timeout_ms: u64,
    /// 保留配置项：dispatch 为单次尝试，不读取该值
    pub max_retries: u32,
    pub replication_interval_secs: u64,
    pub peer_selection: PeerSelection,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let public_url = std::env::var("PUBLIC_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());
        let raw_nodes = std::env::var("REPLICA_NODES")
            .unwrap_or_else(|_| "http://localhost:5001,http://localhost:5002".into());
        let http_port = std::env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        Self {
            node_id: std::env::var("NODE_ID").unwrap_or_else(|_| "nodo1".into()),
            http_port,
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            replica_enabled: std::env::var("REPLICA_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            replica_nodes: normalize_peers(
                raw_nodes.split(','),
                &own_urls(public_url.as_deref(), http_port),
            ),
            public_url,
            probe_timeout_ms: std::env::var("PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            replication_timeout_ms: std::env::var("REPLICATION_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            max_retries: std::env::var("MAX_RETRIES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
            replication_interval_secs: std::env::var("REPLICATION_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            peer_selection: std::env::var("PEER_SELECTION")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景，其余字段取默认值而不读环境变量
    pub fn with_overrides<I, S>(
        node_id: impl Into<String>,
        work_dir: impl Into<String>,
        http_port: u16,
        peers: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<S> = peers.into_iter().collect();
        Self {
            node_id: node_id.into(),
            http_port,
            work_dir: work_dir.into(),
            replica_enabled: true,
            replica_nodes: normalize_peers(peers.iter().map(|p| p.as_ref()), &own_urls(None, http_port)),
            public_url: None,
            probe_timeout_ms: 3000,
            replication_timeout_ms: 5000,
            max_retries: 3,
            replication_interval_secs: 0,
            peer_selection: PeerSelection::Random,
            log_level: "info".into(),
            log_dir: None,
        }
    }

    /// 数据库文件路径: work_dir/node.redb
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("node.redb")
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn replication_timeout(&self) -> Duration {
        Duration::from_millis(self.replication_timeout_ms)
    }

    /// 定时复制间隔，未配置时返回 None
    pub fn replication_interval(&self) -> Option<Duration> {
        (self.replication_interval_secs > 0)
            .then(|| Duration::from_secs(self.replication_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// URLs that address this node: loopback on our port, plus PUBLIC_URL
fn own_urls(public_url: Option<&str>, http_port: u16) -> Vec<String> {
    let mut own = vec![
        format!("http://localhost:{http_port}"),
        format!("http://127.0.0.1:{http_port}"),
    ];
    if let Some(url) = public_url {
        own.push(url.trim().trim_end_matches('/').to_string());
    }
    own
}

/// Trim, drop blanks and trailing slashes, drop our own URLs and duplicates.
fn normalize_peers<'a>(raw: impl Iterator<Item = &'a str>, own: &[String]) -> Vec<String> {
    let mut peers: Vec<String> = Vec::new();
    for url in raw {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() || own.iter().any(|o| o == url) || peers.iter().any(|p| p == url) {
            continue;
        }
        peers.push(url.to_string());
    }
    peers
}
