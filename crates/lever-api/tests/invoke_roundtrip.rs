//! 调用路径的端到端契约测试：真实套接字上的完整往返。
//!
//! # 覆盖目标（What）
//! - 编解码往返正确性：`invoke(m, a)` 与直接调用处理器一致；
//! - 四类错误的可区分性：带内应用错误、方法缺失、传输失败、超时；
//! - 强制主机对发现的无条件覆盖；
//! - 并发调用互不串扰；
//! - 协议故障只影响当前连接。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lever_api::{
    ApplicationError, Client, ClientConfig, HandlerObject, InvokeError, MethodSet, RegistryError,
    ResolvedEndpoint, Server, ServerConfig, ServiceAddress, StaticDiscovery,
};
use lever_transport_tcp::FrameConnection;

struct GreeterHandler;

impl HandlerObject for GreeterHandler {
    fn expose(self: Arc<Self>, methods: &mut MethodSet) -> Result<(), RegistryError> {
        methods.method("say_hello", |name: String| async move {
            Ok::<_, ApplicationError>(format!("Hello, {name}!"))
        })?;
        methods.method("add", |a: i64, b: i64| async move {
            Ok::<_, ApplicationError>(a + b)
        })?;
        methods.method("fail_always", |reason: String| async move {
            Err::<String, _>(ApplicationError::new(format!("handler refused: {reason}")))
        })?;
        Ok(())
    }
}

fn endpoint_of(addr: SocketAddr) -> ResolvedEndpoint {
    ResolvedEndpoint::new(addr.ip().to_string(), addr.port())
}

/// 在随机端口启动问候服务，返回监听地址。
async fn start_hello_server() -> SocketAddr {
    let server = Server::new(
        ServerConfig::new().with_bind(ResolvedEndpoint::new("127.0.0.1", 0)),
    );
    server
        .register_object(Arc::new(GreeterHandler))
        .expect("注册应成功");
    let bound = server.bind().await.expect("绑定应成功");
    let addr = bound.local_addr();
    tokio::spawn(bound.serve());
    addr
}

fn forced_client(addr: SocketAddr) -> Client {
    Client::new(ClientConfig::new().with_force_host(endpoint_of(addr)))
}

/// 远程调用的结果应与直接调用处理器一致（编解码往返正确性）。
#[tokio::test]
async fn invoke_round_trip_matches_a_direct_call() {
    let addr = start_hello_server().await;
    let client = forced_client(addr);
    let hello = client.service("dev.lever", "helloService");

    let reply: String = hello
        .invoke("say_hello", ("world",))
        .await
        .expect("调用应成功");
    assert_eq!(reply, "Hello, world!", "结果应与处理器本地执行一致");

    let sum: i64 = hello
        .invoke("add", (20_i64, 22_i64))
        .await
        .expect("调用应成功");
    assert_eq!(sum, 42);
}

/// 方法缺失是带内应用层错误，必须与传输失败可区分。
#[tokio::test]
async fn unknown_methods_are_distinguishable_from_transport_failures() {
    let addr = start_hello_server().await;
    let client = forced_client(addr);
    let hello = client.service("dev.lever", "helloService");

    let err = hello
        .invoke::<_, String>("no_such_method", ("x",))
        .await
        .expect_err("未注册方法应失败");
    assert!(err.is_application(), "应归为应用层错误");
    assert!(!err.is_transport(), "不得归为传输失败");
    assert_eq!(err.code(), "dispatch.method_not_found");
}

/// 处理器业务失败带内送达，消息原样保留。
#[tokio::test]
async fn application_errors_carry_the_handler_message() {
    let addr = start_hello_server().await;
    let client = forced_client(addr);
    let hello = client.service("dev.lever", "helloService");

    let err = hello
        .invoke::<_, String>("fail_always", ("quota exceeded",))
        .await
        .expect_err("处理器失败应送达调用方");
    match err {
        InvokeError::Application(remote) => {
            assert_eq!(remote.code, "app.handler_failure");
            assert_eq!(remote.message, "handler refused: quota exceeded");
        }
        other => panic!("应为应用错误，实际为 {other:?}"),
    }
}

/// 结果解码属于调用方类型不符，方法已执行，归类为 ResultDecode。
#[tokio::test]
async fn result_type_mismatches_surface_as_result_decode() {
    let addr = start_hello_server().await;
    let client = forced_client(addr);
    let hello = client.service("dev.lever", "helloService");

    let err = hello
        .invoke::<_, i64>("say_hello", ("world",))
        .await
        .expect_err("文本结果不应解码为整数");
    assert!(matches!(err, InvokeError::ResultDecode { .. }));
}

/// 超时产出传输类错误，且同一客户端的后续独立调用不受影响。
#[tokio::test]
async fn timeouts_are_transport_errors_and_do_not_poison_the_client() {
    let addr = start_hello_server().await;

    // 黑洞端点：接受连接后既不读也不写，调用只能等到超时。
    let black_hole = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("黑洞监听应成功");
    let black_hole_addr = black_hole.local_addr().expect("应取到地址");
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            match black_hole.accept().await {
                Ok((stream, _)) => held.push(stream),
                Err(_) => break,
            }
        }
    });

    let directory = Arc::new(StaticDiscovery::new());
    directory.assign(
        ServiceAddress::new("dev.lever", "stuckService"),
        endpoint_of(black_hole_addr),
    );
    directory.assign(
        ServiceAddress::new("dev.lever", "helloService"),
        endpoint_of(addr),
    );
    let client = Client::with_discovery(
        ClientConfig::new().with_invoke_timeout(Duration::from_millis(200)),
        directory,
    );

    let stuck = client.service("dev.lever", "stuckService");
    let err = stuck
        .invoke::<_, String>("say_hello", ("void",))
        .await
        .expect_err("黑洞端点应超时");
    assert!(err.is_timeout(), "应为超时");
    assert!(err.is_transport(), "超时必须归为传输类");
    assert!(!err.is_application(), "不得伪装成应用错误");

    let hello = client.service("dev.lever", "helloService");
    let reply: String = hello
        .invoke("say_hello", ("again",))
        .await
        .expect("超时不应破坏客户端后续调用");
    assert_eq!(reply, "Hello, again!");
}

/// 强制主机对任意 {环境, 服务} 无条件生效，发现目录完全旁路。
#[tokio::test]
async fn forced_hosts_override_discovery_for_any_address() {
    let addr = start_hello_server().await;

    // 目录刻意留空：若发现被触碰，解析只会失败。
    let client = Client::with_discovery(
        ClientConfig::new().with_force_host(endpoint_of(addr)),
        Arc::new(StaticDiscovery::new()),
    );

    let ghost = client.service("prod.lever", "ghostService");
    let reply: String = ghost
        .invoke("say_hello", ("forced",))
        .await
        .expect("强制主机应旁路发现");
    assert_eq!(reply, "Hello, forced!");
}

/// 建连被拒绝是传输类失败，与应用错误可区分。
#[tokio::test]
async fn connection_refusals_are_transport_errors() {
    // 先绑定取得一个端口，再立即释放，留下大概率无人监听的地址。
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("探测监听应成功");
    let vacant = probe.local_addr().expect("应取到地址");
    drop(probe);

    let client = forced_client(vacant);
    let err = client
        .service("dev.lever", "helloService")
        .invoke::<_, String>("say_hello", ("nobody",))
        .await
        .expect_err("无人监听的端口应建连失败");
    assert!(err.is_transport(), "建连失败应归为传输类");
    assert!(!err.is_application());
}

/// 一百个并发调用各自取回与实参匹配的结果，互不串扰。
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_each_get_their_own_result() {
    let addr = start_hello_server().await;
    let client = forced_client(addr);

    let mut joins = Vec::with_capacity(100);
    for index in 0..100 {
        let handle = client.service("dev.lever", "helloService");
        joins.push(tokio::spawn(async move {
            let name = format!("caller-{index}");
            let reply: String = handle
                .invoke("say_hello", (name.clone(),))
                .await
                .expect("并发调用应成功");
            (name, reply)
        }));
    }
    for join in joins {
        let (name, reply) = join.await.expect("任务应正常结束");
        assert_eq!(reply, format!("Hello, {name}!"), "问候应与调用方一一对应");
    }
}

/// 协议故障只关闭当前连接，服务端继续服务其他调用方。
#[tokio::test]
async fn malformed_requests_only_cost_their_own_connection() {
    let addr = start_hello_server().await;

    let mut rogue = FrameConnection::connect(&addr.to_string(), 1024)
        .await
        .expect("建连应成功");
    rogue
        .write_frame(b"this is not a call request")
        .await
        .expect("裸帧应可写出");
    let closed = rogue.read_frame().await.expect("读取应成功");
    assert!(closed.is_none(), "服务端应在帧边界上关闭违规连接");

    let client = forced_client(addr);
    let reply: String = client
        .service("dev.lever", "helloService")
        .invoke("say_hello", ("survivor",))
        .await
        .expect("其他连接不应受协议故障影响");
    assert_eq!(reply, "Hello, survivor!");
}

/// 服务端注册面拒绝重名方法，启动前即暴露部署不一致。
#[tokio::test]
async fn duplicate_registrations_fail_before_serving() {
    let server = Server::new(
        ServerConfig::new().with_bind(ResolvedEndpoint::new("127.0.0.1", 0)),
    );
    server
        .register("say_hello", |name: String| async move {
            Ok::<_, ApplicationError>(format!("Hello, {name}!"))
        })
        .expect("首次注册应成功");
    let err = server
        .register_object(Arc::new(GreeterHandler))
        .expect_err("批量注册撞名应整体失败");
    assert!(matches!(err, RegistryError::DuplicateMethod { name } if name == "say_hello"));
    assert_eq!(server.registry().len(), 1, "失败的批量不得留下条目");
}
