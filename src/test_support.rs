//! Stub HTTP servers for exercising the blocking provider clients.

use std::net::SocketAddr;
use std::sync::mpsc;

use axum::Router;

/// Serve `router` on an ephemeral localhost port from a background thread.
/// Returns the base URL, e.g. `http://127.0.0.1:41234`. The server lives
/// until the test process exits.
pub fn spawn_stub_server(router: Router) -> String {
    let (tx, rx) = mpsc::channel::<SocketAddr>();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("stub server runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind stub server");
            let addr = listener.local_addr().expect("stub server address");
            tx.send(addr).expect("report stub server address");
            axum::serve(listener, router).await.expect("stub server");
        });
    });

    let addr = rx.recv().expect("stub server failed to start");
    format!("http://{addr}")
}
