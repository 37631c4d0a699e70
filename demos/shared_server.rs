//! One echo server shared by every test of a run.
//! Run with: cargo run --example shared_server
//! Fixture logs come from the `tracing` feature, which this package enables.

use scoped_fixtures::{
    run_with_main_scope, CacheScope, Env, Environment, FixtureOptions, MainScopeConfig,
    TestScope,
};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

/// Starts an echo server once per run and returns its address.
fn echo_server(env: &impl Env) -> SocketAddr {
    env.environment().cache(
        &(),
        FixtureOptions::default().scope(CacheScope::Package),
        || {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            let addr = listener.local_addr()?;
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    let mut reader = BufReader::new(&stream);
                    let mut line = String::new();
                    if reader.read_line(&mut line).is_ok() {
                        let _ = (&stream).write_all(line.as_bytes());
                    }
                }
            });
            Ok(addr)
        },
    )
}

fn echo(addr: SocketAddr, message: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect to echo server");
    writeln!(stream, "{message}").expect("send line");
    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line).expect("read echo");
    line.trim_end().to_string()
}

fn main() {
    tracing_subscriber::fmt::init();

    run_with_main_scope(MainScopeConfig::default(), |main_env| {
        for name in ["first_test", "second_test"] {
            TestScope::run(name, |t| {
                let env = Environment::new(t.clone());
                let addr = echo_server(&env);
                println!("{name}: server at {addr} echoed {:?}", echo(addr, name));
            });
        }

        // Same server from the whole-run environment.
        println!("main scope sees {}", echo_server(main_env));
    });
}
