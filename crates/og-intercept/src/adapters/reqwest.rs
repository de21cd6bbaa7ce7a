// adapters/reqwest.rs — reqwest clients as transports.
//
// `reqwest::blocking::Client` implements `Transport`, `reqwest::Client`
// implements `AsyncTransport`. Both send pre-built `Request`s via `execute`,
// so the interceptor sees the final method, URL and headers.

use async_trait::async_trait;

use crate::transport::{AsyncTransport, InboundResponse, OutboundRequest, Transport};

fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

impl OutboundRequest for reqwest::blocking::Request {
    fn method(&self) -> &str {
        reqwest::blocking::Request::method(self).as_str()
    }

    fn url(&self) -> &str {
        reqwest::blocking::Request::url(self).as_str()
    }

    fn headers(&self) -> Vec<(String, String)> {
        header_pairs(reqwest::blocking::Request::headers(self))
    }
}

impl InboundResponse for reqwest::blocking::Response {
    fn status(&self) -> u16 {
        reqwest::blocking::Response::status(self).as_u16()
    }
}

impl Transport for reqwest::blocking::Client {
    type Request = reqwest::blocking::Request;
    type Response = reqwest::blocking::Response;
    type Error = reqwest::Error;

    fn send(&self, request: Self::Request) -> Result<Self::Response, Self::Error> {
        self.execute(request)
    }
}

impl OutboundRequest for reqwest::Request {
    fn method(&self) -> &str {
        reqwest::Request::method(self).as_str()
    }

    fn url(&self) -> &str {
        reqwest::Request::url(self).as_str()
    }

    fn headers(&self) -> Vec<(String, String)> {
        header_pairs(reqwest::Request::headers(self))
    }
}

impl InboundResponse for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }
}

#[async_trait]
impl AsyncTransport for reqwest::Client {
    type Request = reqwest::Request;
    type Response = reqwest::Response;
    type Error = reqwest::Error;

    async fn send_async(&self, request: Self::Request) -> Result<Self::Response, Self::Error> {
        self.execute(request).await
    }
}
