// Analytics backend HTTP client.
// Handles default headers and request/response status processing.

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};

use crate::error::{Error, Result};

/// Host whose traffic carries the station listings.
pub const DEFAULT_BACKEND_HOST: &str = "devcon-go.am.xiaojukeji.com";
pub const DEFAULT_BASE_URL: &str = "https://devcon-go.am.xiaojukeji.com";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.110 Safari/537.36";

/// Client for the station statistics endpoints.
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client rooted at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(Error::Api)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_params<T: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(Error::Api)?;

        check_response(response)
    }
}

/// Check response status and convert errors.
fn check_response(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        StatusCode::NOT_FOUND => Err(Error::NotFound(response.url().to_string())),
        status => Err(Error::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        }),
    }
}
