use crate::error::{Cause, ClientError, Result};
use crate::types::{
    ApiResponse, ChannelsPayload, CreateChannelPayload, GroupsPayload, LoginResponse,
    MessagesPayload, PostMessagePayload, UserInfoPayload, UsersPayload,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const API_PREFIX: &str = "/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_LIMIT: usize = 512;
const AUTH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-auth-token");
const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Connection settings as supplied at startup. Blank strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub server_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Clone)]
pub enum Credentials {
    Password { username: String, password: String },
    Token { user_id: String, auth_token: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Token { user_id, .. } => f
                .debug_struct("Token")
                .field("user_id", user_id)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// A complete token pair wins over a username/password pair.
    pub fn resolve(config: &ClientConfig) -> Result<Self> {
        let user_id = non_blank(config.user_id.as_deref());
        let auth_token = non_blank(config.auth_token.as_deref());
        if let (Some(user_id), Some(auth_token)) = (user_id, auth_token) {
            return Ok(Self::Token {
                user_id: user_id.to_string(),
                auth_token: auth_token.to_string(),
            });
        }

        let username = non_blank(config.username.as_deref());
        let password = config.password.as_deref().filter(|value| !value.is_empty());
        if let (Some(username), Some(password)) = (username, password) {
            return Ok(Self::Password {
                username: username.to_string(),
                password: password.to_string(),
            });
        }

        Err(ClientError::Configuration(
            "provide either username/password or user_id/auth_token".to_string(),
        ))
    }
}

/// Token pair issued by login (or supplied up front), sent on every request.
#[derive(Clone)]
pub struct Session {
    pub auth_token: String,
    pub user_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// One call against `/api/v1/{endpoint}`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    body: Option<serde_json::Value>,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct RocketChatClient {
    http: reqwest::Client,
    server_url: String,
    credentials: Credentials,
    session: Option<Session>,
}

impl RocketChatClient {
    /// Validates settings without touching the network.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let server_url = normalize_server_url(&config.server_url)?;
        let credentials = Credentials::resolve(&config)?;
        // Idle connections are never kept: each call acquires and releases its own.
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ClientError::Configuration(format!("build http client: {e}")))?;

        let session = match &credentials {
            Credentials::Token {
                user_id,
                auth_token,
            } => Some(Session {
                auth_token: auth_token.clone(),
                user_id: user_id.clone(),
            }),
            Credentials::Password { .. } => None,
        };

        match &credentials {
            Credentials::Token { .. } => {
                tracing::info!(server_url = %server_url, "rocket.chat client initialized with auth token")
            }
            Credentials::Password { username, .. } => {
                tracing::info!(server_url = %server_url, %username, "rocket.chat client will log in with password")
            }
        }

        Ok(Self {
            http,
            server_url,
            credentials,
            session,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Logs in with the stored password credentials unless a session already exists.
    pub async fn authenticate(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let Credentials::Password { username, password } = self.credentials.clone() else {
            return Err(ClientError::Configuration(
                "token credentials did not produce a session".to_string(),
            ));
        };
        self.login(&username, &password).await
    }

    #[tracing::instrument(level = "info", skip(self, password), fields(server_url = %self.server_url))]
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let url = self.api_url("login")?;
        let response = self
            .http
            .post(url)
            .json(&json!({
                "user": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "login request failed");
                ClientError::authentication(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body_excerpt(response).await;
            tracing::error!(%status, %body, "login rejected");
            return Err(ClientError::authentication(Cause::Status { status, body }));
        }

        let body: LoginResponse = response.json().await.map_err(ClientError::authentication)?;
        if body.status.as_deref() != Some("success") {
            let detail = body
                .message
                .or(body.error)
                .unwrap_or_else(|| "login response status was not success".to_string());
            tracing::error!(status = ?body.status, %detail, "login failed");
            return Err(ClientError::Authentication {
                message: detail,
                cause: None,
            });
        }
        let data = body.data.ok_or_else(|| ClientError::Authentication {
            message: "login response missing data".to_string(),
            cause: None,
        })?;

        tracing::info!(user_id = %data.user_id, "login successful");
        self.session = Some(Session {
            auth_token: data.auth_token,
            user_id: data.user_id,
        });
        Ok(())
    }

    /// Authenticated call; returns the parsed JSON body of any 2xx response.
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(method = %request.method, endpoint = %request.endpoint)
    )]
    pub async fn request(&self, request: ApiRequest) -> Result<serde_json::Value> {
        let ApiRequest {
            method,
            endpoint,
            body,
            query,
        } = request;
        let Some(session) = self.session.as_ref() else {
            return Err(ClientError::Authentication {
                message: format!("not logged in; cannot call {endpoint}"),
                cause: None,
            });
        };

        let url = self.api_url(&endpoint)?;
        let mut builder = self
            .http
            .request(method.clone(), url)
            .headers(auth_headers(session)?);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "request failed");
            ClientError::request(method.as_str(), &endpoint, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body_excerpt(response).await;
            tracing::error!(%status, %body, "request returned error status");
            return Err(ClientError::request(
                method.as_str(),
                &endpoint,
                Cause::Status { status, body },
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::request(method.as_str(), &endpoint, e))?;
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(error = %e, "response body is not json");
            ClientError::request(method.as_str(), &endpoint, e)
        })?;
        tracing::debug!("request successful");
        Ok(value)
    }

    /// `request` followed by decoding into the typed envelope for the endpoint.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<ApiResponse<T>> {
        let method = request.method.clone();
        let endpoint = request.endpoint.clone();
        let value = self.request(request).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::request(method.as_str(), &endpoint, e))
    }

    pub async fn users_list(&self) -> Result<ApiResponse<UsersPayload>> {
        self.send(ApiRequest::get("users.list")).await
    }

    pub async fn users_info(&self, username: &str) -> Result<ApiResponse<UserInfoPayload>> {
        self.send(ApiRequest::get("users.info").with_query("username", username))
            .await
    }

    pub async fn channels_list(&self) -> Result<ApiResponse<ChannelsPayload>> {
        self.send(ApiRequest::get("channels.list")).await
    }

    pub async fn groups_list(&self) -> Result<ApiResponse<GroupsPayload>> {
        self.send(ApiRequest::get("groups.list")).await
    }

    pub async fn channels_messages(
        &self,
        room_id: &str,
        count: u32,
    ) -> Result<ApiResponse<MessagesPayload>> {
        self.send(
            ApiRequest::get("channels.messages")
                .with_query("roomId", room_id)
                .with_query("count", count),
        )
        .await
    }

    pub async fn channels_create(&self, name: &str) -> Result<ApiResponse<CreateChannelPayload>> {
        self.send(ApiRequest::post("channels.create").with_body(json!({ "name": name })))
            .await
    }

    pub async fn chat_post_message(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<ApiResponse<PostMessagePayload>> {
        self.send(ApiRequest::post("chat.postMessage").with_body(json!({
            "channel": channel,
            "text": text,
        })))
        .await
    }

    fn api_url(&self, endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.trim_start_matches('/');
        Url::parse(&format!("{}{API_PREFIX}/{endpoint}", self.server_url)).map_err(|e| {
            ClientError::Configuration(format!("invalid api url for endpoint {endpoint:?}: {e}"))
        })
    }
}

fn auth_headers(session: &Session) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let token = HeaderValue::from_str(&session.auth_token)
        .map_err(|e| ClientError::Configuration(format!("auth token is not a valid header: {e}")))?;
    let user_id = HeaderValue::from_str(&session.user_id)
        .map_err(|e| ClientError::Configuration(format!("user id is not a valid header: {e}")))?;
    headers.insert(AUTH_TOKEN_HEADER, token);
    headers.insert(USER_ID_HEADER, user_id);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

async fn read_body_excerpt(response: reqwest::Response) -> String {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response body>".to_string());
    if body.len() <= ERROR_BODY_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

fn normalize_server_url(raw: &str) -> Result<String> {
    let normalized = raw.trim().trim_end_matches('/').to_string();
    if normalized.is_empty() {
        return Err(ClientError::Configuration(
            "rocket.chat server url is required".to_string(),
        ));
    }
    let parsed = Url::parse(&normalized).map_err(|e| {
        ClientError::Configuration(format!("invalid rocket.chat server url: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(normalized),
        other => Err(ClientError::Configuration(format!(
            "invalid rocket.chat server url scheme: {other} (expected http or https)"
        ))),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{ApiRequest, ClientConfig, Credentials, RocketChatClient, normalize_server_url};
    use crate::error::ClientError;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn password_config(server_url: &str) -> ClientConfig {
        ClientConfig {
            server_url: server_url.to_string(),
            username: Some("bot".to_string()),
            password: Some("secret".to_string()),
            ..ClientConfig::default()
        }
    }

    fn token_config(server_url: &str) -> ClientConfig {
        ClientConfig {
            server_url: server_url.to_string(),
            user_id: Some("uid-1".to_string()),
            auth_token: Some("tok-1".to_string()),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn server_url_strips_trailing_slashes_and_requires_http() {
        assert_eq!(
            normalize_server_url("https://chat.example.com//").expect("https"),
            "https://chat.example.com"
        );
        assert!(normalize_server_url("http://localhost:3000").is_ok());
        assert!(normalize_server_url("ftp://chat.example.com").is_err());
        assert!(normalize_server_url("   ").is_err());
    }

    #[test]
    fn construction_without_full_credential_pair_fails() {
        let config = ClientConfig {
            server_url: "https://chat.example.com".to_string(),
            username: Some("bot".to_string()),
            auth_token: Some("tok".to_string()),
            ..ClientConfig::default()
        };
        let err = RocketChatClient::new(config).expect_err("incomplete credentials");
        assert!(matches!(err, ClientError::Configuration(_)));

        let blank = ClientConfig {
            server_url: "https://chat.example.com".to_string(),
            username: Some("  ".to_string()),
            password: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        assert!(matches!(
            RocketChatClient::new(blank),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn token_pair_takes_precedence_and_opens_session() {
        let mut config = token_config("https://chat.example.com/");
        config.username = Some("bot".to_string());
        config.password = Some("secret".to_string());
        let client = RocketChatClient::new(config).expect("client");
        assert!(matches!(client.credentials(), Credentials::Token { .. }));
        let session = client.session().expect("session");
        assert_eq!(session.user_id, "uid-1");
        assert_eq!(session.auth_token, "tok-1");
        assert_eq!(client.server_url(), "https://chat.example.com");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let client = RocketChatClient::new(password_config("https://chat.example.com"))
            .expect("client");
        let rendered = format!("{client:?}");
        assert!(rendered.contains("bot"));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn construction_performs_no_network_io() {
        let server = MockServer::start().await;
        let _client = RocketChatClient::new(password_config(&server.uri())).expect("client");
        let received = server.received_requests().await.expect("recording enabled");
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn login_stores_token_pair_from_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .and(body_json(serde_json::json!({"user": "bot", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "authToken": "top-level-ignored",
                "data": {"authToken": "tok-9", "userId": "uid-9"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = RocketChatClient::new(password_config(&server.uri())).expect("client");
        assert!(client.session().is_none());
        client.authenticate().await.expect("login");
        let session = client.session().expect("session");
        assert_eq!(session.auth_token, "tok-9");
        assert_eq!(session.user_id, "uid-9");
    }

    #[tokio::test]
    async fn login_rejects_non_success_status_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "message": "Unauthorized",
                "data": {"authToken": "tok", "userId": "uid"}
            })))
            .mount(&server)
            .await;

        let mut client = RocketChatClient::new(password_config(&server.uri())).expect("client");
        let err = client.login("bot", "secret").await.expect_err("rejected");
        match err {
            ClientError::Authentication { message, .. } => assert_eq!(message, "Unauthorized"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn login_maps_http_error_to_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"status":"error","error":"Unauthorized"}"#),
            )
            .mount(&server)
            .await;

        let mut client = RocketChatClient::new(password_config(&server.uri())).expect("client");
        let err = client.login("bot", "wrong").await.expect_err("401");
        match err {
            ClientError::Authentication { message, cause } => {
                assert!(message.contains("401"));
                assert!(cause.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_maps_unreachable_server_to_authentication_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let uri = format!("http://{}", listener.local_addr().expect("addr"));
        drop(listener);

        let mut client = RocketChatClient::new(password_config(&uri)).expect("client");
        let err = client.login("bot", "secret").await.expect_err("unreachable");
        assert!(matches!(err, ClientError::Authentication { cause: Some(_), .. }));
    }

    #[tokio::test]
    async fn request_sends_auth_headers_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users.info"))
            .and(query_param("username", "alice"))
            .and(header("X-Auth-Token", "tok-1"))
            .and(header("X-User-Id", "uid-1"))
            .and(header("Content-Type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "user": {"username": "alice"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = RocketChatClient::new(token_config(&server.uri())).expect("client");
        let value = client
            .request(ApiRequest::get("users.info").with_query("username", "alice"))
            .await
            .expect("request");
        assert_eq!(value["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn request_posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/channels.create"))
            .and(body_json(serde_json::json!({"name": "ops"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "channel": {"_id": "room-1", "name": "ops"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RocketChatClient::new(token_config(&server.uri())).expect("client");
        let response = client.channels_create("ops").await.expect("create");
        assert!(response.success);
        let channel = response.payload.channel.expect("channel");
        assert_eq!(channel.id.as_deref(), Some("room-1"));
    }

    #[tokio::test]
    async fn request_maps_error_status_to_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/channels.list"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = RocketChatClient::new(token_config(&server.uri())).expect("client");
        let err = client.channels_list().await.expect_err("403");
        match err {
            ClientError::Request {
                method,
                endpoint,
                message,
                ..
            } => {
                assert_eq!(method, "GET");
                assert_eq!(endpoint, "channels.list");
                assert!(message.contains("403"));
                assert!(message.contains("forbidden"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_maps_malformed_json_to_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups.list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = RocketChatClient::new(token_config(&server.uri())).expect("client");
        let err = client.groups_list().await.expect_err("malformed");
        assert!(matches!(err, ClientError::Request { .. }));
    }

    #[tokio::test]
    async fn request_without_session_fails_before_network() {
        let server = MockServer::start().await;
        let client = RocketChatClient::new(password_config(&server.uri())).expect("client");
        let err = client.users_list().await.expect_err("no session");
        assert!(matches!(err, ClientError::Authentication { .. }));
        let received = server.received_requests().await.expect("recording enabled");
        assert!(received.is_empty());
    }
}
