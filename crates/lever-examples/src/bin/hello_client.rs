//! 问候客户端演示：定位 `dev.lever/helloService` 并调用 `say_hello`。
//!
//! # 使用方法
//! ```bash
//! LEVEROS_IP_PORT="127.0.0.1:8080" cargo run --bin hello-client
//! ```
//! 设置 `LEVEROS_IP_PORT` 后，所有解析无条件指向该端点（强制主机模式），
//! 本地开发无需接入真实发现域。

use lever_api::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 环境变量由演示代码读取后显式注入，核心不读环境。
    let mut config = ClientConfig::new();
    if let Ok(literal) = std::env::var("LEVEROS_IP_PORT") {
        config = config.with_force_host_literal(&literal)?;
    }

    let client = Client::new(config);
    let hello = client.service("dev.lever", "helloService");
    let reply: String = hello.invoke("say_hello", ("world",)).await?;
    println!("{reply}");
    Ok(())
}
