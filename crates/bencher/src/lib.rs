use bytes::Bytes;
use http::Method;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    pub fn small(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Small, request)
    }

    pub fn normal(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Normal, request)
    }

    pub fn large(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Large, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

/// A request fixture that can be rebuilt for every iteration.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    method: &'static str,
    uri: &'static str,
    json_body: Option<&'static str>,
}

impl TestRequest {
    pub const fn get(uri: &'static str) -> Self {
        Self { method: "GET", uri, json_body: None }
    }

    pub const fn post(uri: &'static str, json_body: &'static str) -> Self {
        Self { method: "POST", uri, json_body: Some(json_body) }
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn to_http(&self) -> http::Request<Bytes> {
        let method = Method::from_bytes(self.method.as_bytes()).unwrap_or(Method::GET);
        let builder = http::Request::builder().method(method).uri(self.uri);
        let result = match self.json_body {
            Some(body) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Bytes::from_static(body.as_bytes())),
            None => builder.body(Bytes::new()),
        };
        result.unwrap_or_default()
    }
}

/// The number of routes registered ahead of the one a case hits.
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    pub fn route_count(self) -> usize {
        match self {
            TestGroup::Small => 8,
            TestGroup::Normal => 64,
            TestGroup::Large => 512,
        }
    }
}
