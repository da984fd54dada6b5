/// A named wire fixture fed to a codec benchmark.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    file: TestFile,
}

impl TestCase {
    pub const fn new(name: &'static str, file: TestFile) -> Self {
        Self { name, file }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

pub static GET_SMALL: TestFile = TestFile::new(
    "get_small.txt",
    "GET /chat HTTP/1.1\r\n\
     Host: gateway.local\r\n\
     Upgrade: websocket\r\n\
     Connection: Upgrade\r\n\
     \r\n",
);

pub static GET_LARGE: TestFile = TestFile::new(
    "get_large.txt",
    "GET /api/v1/streams/market-data?symbols=BTC,ETH,SOL&depth=20 HTTP/1.1\r\n\
     Host: gateway.example.com:8443\r\n\
     User-Agent: Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36\r\n\
     Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
     Accept-Language: en-US,en;q=0.9,de;q=0.8\r\n\
     Accept-Encoding: gzip, deflate, br\r\n\
     Cache-Control: no-cache\r\n\
     Pragma: no-cache\r\n\
     Origin: https://app.example.com\r\n\
     Referer: https://app.example.com/dashboard/overview\r\n\
     Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
     Sec-WebSocket-Version: 13\r\n\
     Sec-WebSocket-Extensions: permessage-deflate; client_max_window_bits\r\n\
     Upgrade: websocket\r\n\
     Connection: keep-alive, Upgrade\r\n\
     Cookie: $Version=1; session=8f14e45fceea167a5a36dedd4bea2543; $Path=/; theme=dark\r\n\
     X-Request-Id: 4f6c1c2e-9a57-4d7e-b8f5-0c1d2e3f4a5b\r\n\
     X-Forwarded-For: 203.0.113.7, 198.51.100.23\r\n\
     \r\n",
);

pub static CHUNKED_RESPONSE: TestFile = TestFile::new(
    "chunked_response.txt",
    "HTTP/1.1 200 OK\r\n\
     Content-Type: application/json\r\n\
     Transfer-Encoding: chunked\r\n\
     \r\n\
     1A\r\n\
     {\"symbol\":\"BTC\",\"px\":6123}\r\n\
     1A\r\n\
     {\"symbol\":\"ETH\",\"px\":3011}\r\n\
     0\r\n\
     \r\n",
);
