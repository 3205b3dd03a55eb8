//! End-to-end tests: real sockets against a launched terminal

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use vantage_auth::derive_token;
use vantage_config::Config;
use vantage_protocol::{
    Configure, ConfigEntityUpdate, ControlTrace, DEFAULT_MAX_MESSAGE_SIZE, EntityValue, Envelope,
    Login, Message, NewConfigClass, PushCommand, SessionReset, SessionState, ShellOutput,
    SignalFetchTraces, TraceClassList, TraceUpdate, read_frame, write_frame,
};
use vantage_terminal::{ConfigStore, MemoryConfigStore, Terminal};
use vantage_trace::TraceRegistry;
use vantage_trace::hash::{child_hash, root_hash};

const WAIT: Duration = Duration::from_secs(5);

const CONFIG: &str = r#"
[server]
address = "127.0.0.1"
port = 0
credentials = "admin:pw:w;viewer:view:r"

[session]
name = "e2e"
description = "integration"
state_interval = "50ms"
enumerate_interval = "50ms"
tick_interval = "10ms"
"#;

struct Fixture {
    terminal: Terminal,
    registry: TraceRegistry,
    store: Arc<MemoryConfigStore>,
}

fn fixture() -> Fixture {
    let config = Config::from_str(CONFIG).unwrap();
    let registry = TraceRegistry::new();
    let store = Arc::new(MemoryConfigStore::new());
    let terminal = Terminal::new(&config, registry.clone(), store.clone()).unwrap();
    Fixture {
        terminal,
        registry,
        store,
    }
}

async fn connect(terminal: &Terminal) -> TcpStream {
    let address = terminal
        .dispatcher()
        .wait_bound(WAIT)
        .expect("terminal never bound");
    TcpStream::connect(address).await.unwrap()
}

async fn send<M: Message>(stream: &mut TcpStream, message: &M) {
    let body = Envelope::from_message(0, message)
        .unwrap()
        .to_body()
        .unwrap();
    write_frame(stream, &body).await.unwrap();
}

async fn login(stream: &mut TcpStream, password: &str) {
    let login = Login {
        token: derive_token(password),
    };
    send(stream, &login).await;
}

/// Read frames until one carries `M`, skipping everything else
async fn receive<M: Message>(stream: &mut TcpStream) -> M {
    timeout(WAIT, async {
        loop {
            let body = read_frame(stream, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
            let envelope = Envelope::decode(&body).unwrap();
            if envelope.is::<M>() {
                return envelope.parse::<M>().unwrap();
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {} received", M::ROUTE))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Drive a tracer from its own thread until dropped
struct Workload {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Workload {
    fn start(registry: &TraceRegistry) -> Self {
        let tracer = registry.create(0, "main").unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut frame = 0i64;
            while flag.load(Ordering::Relaxed) {
                let root = tracer.fork("frame", 0);
                {
                    let update = root.timer("update");
                    drop(update.branch_with("entities", frame));
                }
                drop(root.branch_with("index", frame));
                drop(root);
                frame += 1;
                thread::sleep(Duration::from_millis(5));
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }
}

impl Drop for Workload {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// Read-only access
// ============================================================================

#[tokio::test]
async fn test_readonly_client_input_is_discarded_but_receives_pushes() {
    let fx = fixture();
    fx.terminal.launch().unwrap();

    let mut viewer = connect(&fx.terminal).await;
    login(&mut viewer, "view").await;
    wait_until(|| fx.terminal.dispatcher().active_connections() == 1).await;

    send(
        &mut viewer,
        &PushCommand {
            command: "shutdown".into(),
        },
    )
    .await;

    let state: SessionState = receive(&mut viewer).await;
    assert!(state.cpu_usage_total >= 0.0);

    assert!(fx.terminal.poll_command(Duration::from_millis(200)).is_none());

    // Still connected and still receiving
    let _: SessionState = receive(&mut viewer).await;
    assert_eq!(fx.terminal.dispatcher().active_connections(), 1);

    fx.terminal.shutdown();
}

// ============================================================================
// Read-write session
// ============================================================================

#[tokio::test]
async fn test_admin_bootstrap_and_commands() {
    let fx = fixture();
    let vsync = fx.store.insert("render", "vsync", json!(false));
    fx.terminal.write_shell("booted\npartial");
    fx.terminal.launch().unwrap();

    let mut admin = connect(&fx.terminal).await;
    login(&mut admin, "wrong").await;
    login(&mut admin, "pw").await;

    let reset: SessionReset = receive(&mut admin).await;
    assert_eq!(reset.name, "e2e");
    assert_eq!(reset.description, "integration");
    assert!(reset.num_cores >= 1);

    let shell: ShellOutput = receive(&mut admin).await;
    assert_eq!(shell.content, "booted\n");

    let class: NewConfigClass = receive(&mut admin).await;
    assert_eq!(class.key, "render");
    assert_eq!(class.root.entities[0].config_key, vsync);

    send(
        &mut admin,
        &PushCommand {
            command: "hello".into(),
        },
    )
    .await;
    assert_eq!(
        fx.terminal.poll_command(WAIT).as_deref(),
        Some("hello")
    );

    send(
        &mut admin,
        &Configure {
            class_key: "render".into(),
            content: vec![EntityValue {
                config_key: vsync,
                value: json!(true),
            }],
        },
    )
    .await;

    let update: ConfigEntityUpdate = receive(&mut admin).await;
    assert_eq!(update.class_key, "render");
    assert_eq!(update.content[0].value, json!(true));
    assert_eq!(fx.store.serialize("render", vsync), Some(json!(true)));

    fx.terminal.write_shell(" done\n");
    let shell: ShellOutput = receive(&mut admin).await;
    assert_eq!(shell.content, "partial done\n");

    fx.terminal.shutdown();
}

// ============================================================================
// Traces
// ============================================================================

#[tokio::test]
async fn test_fetch_and_control_traces() {
    let fx = fixture();
    let _workload = Workload::start(&fx.registry);
    fx.terminal.launch().unwrap();

    let mut admin = connect(&fx.terminal).await;
    login(&mut admin, "pw").await;

    let list: TraceClassList = receive(&mut admin).await;
    assert_eq!(list.content, vec!["main".to_string()]);

    send(
        &mut admin,
        &SignalFetchTraces {
            targets: vec!["main".into()],
        },
    )
    .await;

    let traces: TraceUpdate = receive(&mut admin).await;
    assert_eq!(traces.class_name, "main");
    assert_eq!(traces.root.name, "frame");
    assert_eq!(traces.root.children[0].name, "update");
    assert_eq!(traces.root.children[0].children[0].name, "entities");

    let update = child_hash(root_hash("frame"), "update");
    assert_eq!(traces.root.children[0].trace_key, update);

    send(
        &mut admin,
        &ControlTrace {
            class_name: "main".into(),
            trace_key: update,
            fold: Some(true),
            subscribe: Some(true),
        },
    )
    .await;

    let tracer = fx.registry.find("main").unwrap();
    wait_until(|| tracer.flags(update).is_some_and(|f| f.is_folded())).await;
    assert!(tracer.flags(update).unwrap().is_subscribed());

    send(
        &mut admin,
        &SignalFetchTraces {
            targets: vec!["main".into()],
        },
    )
    .await;
    let traces: TraceUpdate = receive(&mut admin).await;
    assert!(traces.root.children[0].folded);
    assert!(traces.root.children[0].children.is_empty());

    fx.terminal.shutdown();
}
