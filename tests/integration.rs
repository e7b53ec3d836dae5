use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use ferroftpd::config::Config;
use ferroftpd::core_log::LogSink;
use ferroftpd::server::Server;

struct TestServer {
    server: Server,
    port: u16,
    root: tempfile::TempDir,
}

async fn start_server() -> TestServer {
    start_server_with(|_| {}).await
}

async fn start_server_with(tweak: impl FnOnce(&mut Config)) -> TestServer {
    let root = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.server.root_path = root.path().to_str().unwrap().to_string();
    config.server.listen_port = Some(0);
    tweak(&mut config);

    let mut server = Server::new(config);
    let addr = server.start().await.expect("server start");
    TestServer {
        server,
        port: addr.port(),
        root,
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .expect("connect to control port");
        let (read_half, write_half) = stream.into_split();
        let mut client = Client {
            reader: BufReader::new(read_half),
            writer: write_half,
        };
        let greeting = client.read_reply().await;
        assert_eq!(greeting, "220 FTP Server Ready");
        client
    }

    async fn read_reply(&mut self) -> String {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .expect("read control reply");
        assert!(n > 0, "control connection closed unexpectedly");
        line.trim_end().to_string()
    }

    /// Reads EOF; panics if the server sends anything further.
    async fn expect_closed(&mut self) {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.unwrap_or(0);
        assert_eq!(n, 0, "expected closed connection, got: {}", line);
    }

    async fn send(&mut self, command: &str) -> String {
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .expect("write command");
        self.read_reply().await
    }

    async fn login(&mut self) {
        let reply = self.send("USER admin").await;
        assert!(reply.starts_with("331"), "{}", reply);
        let reply = self.send("PASS password").await;
        assert!(reply.starts_with("230"), "{}", reply);
    }
}

fn parse_pasv_reply(reply: &str) -> SocketAddr {
    assert!(reply.starts_with("227 Entering Passive Mode ("), "{}", reply);
    let open = reply.find('(').unwrap();
    let close = reply.find(')').unwrap();
    let fields: Vec<u16> = reply[open + 1..close]
        .split(',')
        .map(|n| n.parse().expect("numeric PASV field"))
        .collect();
    assert_eq!(fields.len(), 6, "{}", reply);
    SocketAddr::from((
        [
            fields[0] as u8,
            fields[1] as u8,
            fields[2] as u8,
            fields[3] as u8,
        ],
        fields[4] * 256 + fields[5],
    ))
}

#[tokio::test]
async fn happy_login_and_pwd() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    let reply = client.send("USER admin").await;
    assert_eq!(reply, "331 User name okay, need password.");
    let reply = client.send("PASS password").await;
    assert_eq!(reply, "230 User logged in, proceed.");
    let reply = client.send("PWD").await;
    assert_eq!(reply, "257 \"/\" is current directory");

    ts.server.stop().await;
}

#[tokio::test]
async fn wrong_password_allows_fresh_attempt() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    client.send("USER admin").await;
    let reply = client.send("PASS wrong").await;
    assert!(reply.starts_with("530"), "{}", reply);

    client.login().await;
    ts.server.stop().await;
}

#[tokio::test]
async fn pass_without_user_is_bad_sequence() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    let reply = client.send("PASS password").await;
    assert!(reply.starts_with("503"), "{}", reply);

    ts.server.stop().await;
}

#[tokio::test]
async fn commands_require_login_and_have_no_side_effects() {
    let mut ts = start_server().await;
    std::fs::write(ts.root.path().join("keep.txt"), b"data").unwrap();
    let mut client = Client::connect(ts.port).await;

    for command in ["LIST", "PWD", "CWD sub", "MKD newdir", "DELE keep.txt", "PASV"] {
        let reply = client.send(command).await;
        assert!(reply.starts_with("530"), "{}: {}", command, reply);
    }

    assert!(!ts.root.path().join("newdir").exists());
    assert!(ts.root.path().join("keep.txt").exists());
    ts.server.stop().await;
}

#[tokio::test]
async fn handshake_window_admits_only_user_pass_quit_noop() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    client.send("USER admin").await;
    let reply = client.send("SYST").await;
    assert!(reply.starts_with("530"), "{}", reply);
    // Unrecognized verbs are refused by the window too, not answered 502.
    let reply = client.send("XYZZY").await;
    assert!(reply.starts_with("530"), "{}", reply);
    let reply = client.send("NOOP").await;
    assert!(reply.starts_with("200"), "{}", reply);
    let reply = client.send("PASS password").await;
    assert!(reply.starts_with("230"), "{}", reply);

    // Authenticated now, SYST works.
    let reply = client.send("SYST").await;
    assert_eq!(reply, "215 UNIX Type: L8");

    ts.server.stop().await;
}

#[tokio::test]
async fn unknown_command_is_502() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    let reply = client.send("XYZZY").await;
    assert!(reply.starts_with("502"), "{}", reply);

    ts.server.stop().await;
}

#[tokio::test]
async fn type_command_table() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    assert!(client.send("TYPE I").await.starts_with("200"));
    assert!(client.send("TYPE A").await.starts_with("200"));
    assert!(client.send("TYPE A N").await.starts_with("200"));
    assert!(client.send("TYPE L 8").await.starts_with("200"));
    assert!(client.send("TYPE E").await.starts_with("504"));

    ts.server.stop().await;
}

#[tokio::test]
async fn cwd_pwd_mkd_rmd_dele_flow() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    let reply = client.send("MKD sub").await;
    assert_eq!(reply, "257 \"/sub\" created");
    assert!(ts.root.path().join("sub").is_dir());

    let reply = client.send("CWD sub").await;
    assert!(reply.starts_with("250"), "{}", reply);
    let reply = client.send("PWD").await;
    assert_eq!(reply, "257 \"/sub\" is current directory");

    let reply = client.send("CWD ..").await;
    assert!(reply.starts_with("250"), "{}", reply);
    let reply = client.send("PWD").await;
    assert_eq!(reply, "257 \"/\" is current directory");

    let reply = client.send("CWD missing").await;
    assert_eq!(reply, "550 Directory not found.");
    let reply = client.send("PWD").await;
    assert_eq!(reply, "257 \"/\" is current directory");

    let reply = client.send("RMD sub").await;
    assert!(reply.starts_with("250"), "{}", reply);
    assert!(!ts.root.path().join("sub").exists());

    std::fs::write(ts.root.path().join("gone.txt"), b"x").unwrap();
    let reply = client.send("DELE gone.txt").await;
    assert!(reply.starts_with("250"), "{}", reply);
    assert!(!ts.root.path().join("gone.txt").exists());

    let reply = client.send("DELE gone.txt").await;
    assert!(reply.starts_with("550"), "{}", reply);

    ts.server.stop().await;
}

#[tokio::test]
async fn traversal_is_rejected_and_cwd_unchanged() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    // Resolves to the virtual /etc, which does not exist under the root.
    let reply = client.send("CWD /../../etc").await;
    assert_eq!(reply, "550 Directory not found.");
    let reply = client.send("PWD").await;
    assert_eq!(reply, "257 \"/\" is current directory");

    ts.server.stop().await;
}

#[tokio::test]
async fn rename_sequence() {
    let mut ts = start_server().await;
    std::fs::write(ts.root.path().join("old.txt"), b"payload").unwrap();
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    let reply = client.send("RNFR old.txt").await;
    assert_eq!(reply, "350 Ready for RNTO.");
    let reply = client.send("RNTO new.txt").await;
    assert!(reply.starts_with("250"), "{}", reply);
    assert!(!ts.root.path().join("old.txt").exists());
    assert_eq!(
        std::fs::read(ts.root.path().join("new.txt")).unwrap(),
        b"payload"
    );

    let reply = client.send("RNFR missing").await;
    assert!(reply.starts_with("550"), "{}", reply);
    let reply = client.send("RNTO x").await;
    assert_eq!(reply, "503 RNFR required first.");

    // Renaming over an existing entry is refused.
    std::fs::write(ts.root.path().join("blocker.txt"), b"b").unwrap();
    let reply = client.send("RNFR new.txt").await;
    assert!(reply.starts_with("350"), "{}", reply);
    let reply = client.send("RNTO blocker.txt").await;
    assert!(reply.starts_with("550"), "{}", reply);
    assert_eq!(
        std::fs::read(ts.root.path().join("blocker.txt")).unwrap(),
        b"b"
    );
    assert!(ts.root.path().join("new.txt").exists());

    ts.server.stop().await;
}

#[tokio::test]
async fn intervening_command_clears_pending_rename() {
    let mut ts = start_server().await;
    std::fs::write(ts.root.path().join("old.txt"), b"payload").unwrap();
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    let reply = client.send("RNFR old.txt").await;
    assert!(reply.starts_with("350"), "{}", reply);
    let reply = client.send("NOOP").await;
    assert!(reply.starts_with("200"), "{}", reply);
    let reply = client.send("RNTO new.txt").await;
    assert_eq!(reply, "503 RNFR required first.");
    assert!(ts.root.path().join("old.txt").exists());

    ts.server.stop().await;
}

#[tokio::test]
async fn transfer_without_data_channel_is_425() {
    let mut ts = start_server().await;
    std::fs::write(ts.root.path().join("f.txt"), b"x").unwrap();
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    for command in ["LIST", "RETR f.txt", "STOR up.txt"] {
        let reply = client.send(command).await;
        assert!(reply.starts_with("425"), "{}: {}", command, reply);
    }

    ts.server.stop().await;
}

#[tokio::test]
async fn malformed_port_arguments_are_501() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    for command in [
        "PORT 127,0,0,1,4",
        "PORT 127,0,0,1,4,1,9",
        "PORT 256,0,0,1,4,1",
        "PORT a,b,c,d,e,f",
        "PORT",
    ] {
        let reply = client.send(command).await;
        assert!(reply.starts_with("501"), "{}: {}", command, reply);
    }

    ts.server.stop().await;
}

#[tokio::test]
async fn passive_listing_over_data_channel() {
    let mut ts = start_server().await;
    std::fs::write(ts.root.path().join("alpha.txt"), b"hello").unwrap();
    std::fs::create_dir(ts.root.path().join("beta")).unwrap();
    std::fs::write(ts.root.path().join(".hidden"), b"secret").unwrap();
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    let reply = client.send("PASV").await;
    let data_addr = parse_pasv_reply(&reply);
    assert_eq!(data_addr.ip().to_string(), "127.0.0.1");

    let mut data = TcpStream::connect(data_addr).await.expect("data connect");
    let reply = client.send("LIST").await;
    assert!(reply.starts_with("150"), "{}", reply);

    let mut listing = String::new();
    data.read_to_string(&mut listing).await.expect("read listing");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "{}", reply);

    let lines: Vec<&str> = listing.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 2, "{}", listing);
    assert!(lines
        .iter()
        .any(|l| l.starts_with("-rw-r--r--") && l.ends_with("alpha.txt")));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("drw-r--r--") && l.ends_with("beta")));
    assert!(!listing.contains(".hidden"), "{}", listing);

    ts.server.stop().await;
}

#[tokio::test]
async fn passive_retr_stor_binary_round_trip() {
    let mut ts = start_server().await;
    let payload: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 256) as u8).collect();
    std::fs::write(ts.root.path().join("source.bin"), &payload).unwrap();
    let mut client = Client::connect(ts.port).await;
    client.login().await;
    assert!(client.send("TYPE I").await.starts_with("200"));

    // Download.
    let reply = client.send("PASV").await;
    let data_addr = parse_pasv_reply(&reply);
    let mut data = TcpStream::connect(data_addr).await.expect("data connect");
    let reply = client.send("RETR source.bin").await;
    assert!(reply.starts_with("150"), "{}", reply);
    let mut downloaded = Vec::new();
    data.read_to_end(&mut downloaded).await.expect("read file");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "{}", reply);
    assert_eq!(downloaded, payload);

    // Upload what we downloaded.
    let reply = client.send("PASV").await;
    let data_addr = parse_pasv_reply(&reply);
    let mut data = TcpStream::connect(data_addr).await.expect("data connect");
    let reply = client.send("STOR copy.bin").await;
    assert!(reply.starts_with("150"), "{}", reply);
    data.write_all(&downloaded).await.expect("write upload");
    data.shutdown().await.expect("close upload");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "{}", reply);

    assert_eq!(
        std::fs::read(ts.root.path().join("copy.bin")).unwrap(),
        payload
    );

    ts.server.stop().await;
}

#[tokio::test]
async fn active_mode_upload_stores_exact_bytes() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;
    assert!(client.send("TYPE I").await.starts_with("200"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let data_port = listener.local_addr().unwrap().port();
    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let outbound = payload.clone();
    let feeder = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("data accept");
        stream.write_all(&outbound).await.expect("send payload");
        stream.shutdown().await.expect("close data");
    });

    let reply = client
        .send(&format!(
            "PORT 127,0,0,1,{},{}",
            data_port / 256,
            data_port % 256
        ))
        .await;
    assert_eq!(reply, "200 PORT command successful.");

    let reply = client.send("STOR hello.bin").await;
    assert!(reply.starts_with("150"), "{}", reply);
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "{}", reply);
    feeder.await.unwrap();

    assert_eq!(
        std::fs::read(ts.root.path().join("hello.bin")).unwrap(),
        payload
    );

    ts.server.stop().await;
}

#[tokio::test]
async fn retr_missing_file_is_550() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    let reply = client.send("PASV").await;
    parse_pasv_reply(&reply);
    let reply = client.send("RETR nope.bin").await;
    assert_eq!(reply, "550 Failed to open file.");

    ts.server.stop().await;
}

#[tokio::test]
async fn pasv_respects_configured_port_range() {
    let mut ts = start_server_with(|config| {
        config.server.pasv_port_range = Some((50210, 50230));
    })
    .await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    let reply = client.send("PASV").await;
    let data_addr = parse_pasv_reply(&reply);
    assert!(
        (50210..=50230).contains(&data_addr.port()),
        "port {} outside configured range",
        data_addr.port()
    );

    ts.server.stop().await;
}

#[tokio::test]
async fn quit_closes_the_session() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;

    let reply = client.send("QUIT").await;
    assert_eq!(reply, "221 Goodbye.");
    client.expect_closed().await;

    ts.server.stop().await;
}

#[tokio::test]
async fn idle_timeout_sends_421_and_closes() {
    let mut ts = start_server_with(|config| {
        config.server.idle_timeout_secs = Some(1);
    })
    .await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    tokio::time::sleep(Duration::from_secs(2)).await;

    let reply = client.read_reply().await;
    assert!(reply.starts_with("421"), "{}", reply);
    client.expect_closed().await;

    ts.server.stop().await;
}

#[tokio::test]
async fn custom_auth_predicate_is_honored() {
    let root = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.server.root_path = root.path().to_str().unwrap().to_string();
    config.server.listen_port = Some(0);

    let mut server = Server::with_parts(
        config,
        Arc::new(|user: &str, pass: &str| user == "alice" && pass == "secret"),
        Arc::new(LogSink),
    );
    let addr = server.start().await.expect("server start");
    let mut client = Client::connect(addr.port()).await;

    client.send("USER admin").await;
    let reply = client.send("PASS password").await;
    assert!(reply.starts_with("530"), "{}", reply);

    client.send("USER alice").await;
    let reply = client.send("PASS secret").await;
    assert!(reply.starts_with("230"), "{}", reply);

    server.stop().await;
}

#[tokio::test]
async fn set_root_requires_stopped_server() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.server.root_path = first.path().to_str().unwrap().to_string();
    config.server.listen_port = Some(0);

    let mut server = Server::new(config);
    server.start().await.expect("server start");
    assert!(server.is_running());

    let new_root = second.path().join("new_root");
    assert!(server.set_root(new_root.to_str().unwrap()).is_err());

    server.stop().await;
    assert!(!server.is_running());
    server.set_root(new_root.to_str().unwrap()).expect("set_root");
    assert!(new_root.is_dir());

    // Restart and confirm the new root is the one being served.
    std::fs::write(new_root.join("marker.txt"), b"m").unwrap();
    let addr = server.start().await.expect("restart");
    let mut client = Client::connect(addr.port()).await;
    client.login().await;

    let reply = client.send("PASV").await;
    let data_addr = parse_pasv_reply(&reply);
    let mut data = TcpStream::connect(data_addr).await.expect("data connect");
    let reply = client.send("LIST").await;
    assert!(reply.starts_with("150"), "{}", reply);
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.expect("read listing");
    client.read_reply().await;
    assert!(listing.contains("marker.txt"), "{}", listing);

    server.stop().await;
}

#[tokio::test]
async fn stop_drains_live_sessions() {
    let mut ts = start_server().await;
    let mut client = Client::connect(ts.port).await;
    client.login().await;

    ts.server.stop().await;
    client.expect_closed().await;

    // The listener is gone too.
    assert!(TcpStream::connect(("127.0.0.1", ts.port)).await.is_err());
}
