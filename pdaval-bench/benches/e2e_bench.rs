//! End-to-end benchmarks over the line protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdaval_core::Validator;
use pdaval_server::{CommandHandler, Server, ServerConfig};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl Connection {
    async fn call(&mut self, request: &[u8]) -> usize {
        self.writer.write_all(request).await.unwrap();
        self.line.clear();
        self.reader.read_line(&mut self.line).await.unwrap()
    }
}

struct TestSetup {
    server: Arc<Server>,
    conn: Mutex<Connection>,
}

fn setup_server_and_client(rt: &Runtime) -> TestSetup {
    rt.block_on(async {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let server = Arc::new(Server::new(
            config,
            CommandHandler::new(Validator::default()),
        ));
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_clone = server.clone();
        tokio::spawn(async move {
            let _ = server_clone.serve(listener).await;
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        TestSetup {
            server,
            conn: Mutex::new(Connection {
                reader: BufReader::new(read),
                writer,
                line: String::new(),
            }),
        }
    })
}

fn bench_roundtrip_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let setup = setup_server_and_client(&rt);

    let mut group = c.benchmark_group("e2e_roundtrip");

    let requests: [(&str, &[u8]); 4] = [
        ("ping", b"{\"id\":\"1\",\"op\":\"PING\"}\n"),
        (
            "validate_nic",
            b"{\"id\":\"2\",\"op\":\"VALIDATE_NIC\",\"params\":{\"input\":\"951234567V\"}}\n",
        ),
        (
            "validate_postal",
            b"{\"id\":\"3\",\"op\":\"VALIDATE_POSTAL\",\"params\":{\"input\":\"10100\"}}\n",
        ),
        ("list_districts", b"{\"id\":\"4\",\"op\":\"LIST_DISTRICTS\"}\n"),
    ];

    for (name, request) in requests {
        group.bench_function(name, |b| {
            b.to_async(&rt).iter(|| async {
                let mut conn = setup.conn.lock().await;
                black_box(conn.call(request).await)
            });
        });
    }

    group.finish();
    setup.server.shutdown();
}

criterion_group!(benches, bench_roundtrip_latency);

criterion_main!(benches);
