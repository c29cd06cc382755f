//! 问候服务演示：注册 `say_hello` 并开始服务。
//!
//! # 使用方法
//! ```bash
//! cargo run --bin hello-server
//! # 或指定监听地址
//! LEVEROS_LISTEN="0.0.0.0:8080" cargo run --bin hello-server
//! ```
//!
//! # 设计要点（Why）
//! - 对应最小服务端形态：构造 Server、注册 handler 对象、进入服务循环；
//! - 监听地址来自环境变量，由演示代码自行读取后显式注入配置——核心
//!   不隐藏任何配置来源。

use std::sync::Arc;

use lever_api::{
    ApplicationError, HandlerObject, MethodSet, RegistryError, ResolvedEndpoint, Server,
    ServerConfig,
};
use tracing::info;

struct Handler;

impl HandlerObject for Handler {
    fn expose(self: Arc<Self>, methods: &mut MethodSet) -> Result<(), RegistryError> {
        methods.method("say_hello", |name: String| async move {
            Ok::<_, ApplicationError>(format!("Hello, {name}!"))
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let listen = std::env::var("LEVEROS_LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());
    let bind: ResolvedEndpoint = listen.parse()?;

    let server = Server::new(ServerConfig::new().with_bind(bind));
    server.register_object(Arc::new(Handler))?;
    info!(%listen, "问候服务启动");
    server.serve().await?;
    Ok(())
}
