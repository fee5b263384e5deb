//! Multi-hop login handshake against the identity provider
//!
//! The handshake is a strict, single-pass sequence:
//!
//! 1. **FetchLoginForm** - GET the login page and scrape the hidden tokens
//! 2. **Encrypt** - transform the password with the page salt
//! 3. **SubmitLogin** - POST the credentials and walk the redirect chain,
//!    picking up the auth cookie and the first session cookie on the way
//! 4. **WarmSession** - GET the application landing page with only the two
//!    captured cookies to obtain the working session cookie
//!
//! Redirects are followed by hand so every hop's outgoing `Cookie` header and
//! incoming `Set-Cookie` headers can be inspected. Nothing here retries: a
//! failed login aborts the run.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, COOKIE, LOCATION};
use reqwest::{redirect, Client, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::cookies::{extract_rotated_cookie, find_in_cookie_header, Hop, AUTH_COOKIE};
use super::form::LoginForm;
use super::{SessionCookies, SessionState};
use crate::config::PortalConfig;
use crate::crypto::PasswordCipher;
use crate::error::{Error, Result};
use crate::portal::endpoints::Endpoints;
use crate::portal::headers::build_login_headers;
use crate::utils::error::FetchError;

/// Upper bound on redirects followed within one hop chain
const MAX_REDIRECTS: usize = 10;

/// Step of the login state machine, used in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    FetchLoginForm,
    Encrypt,
    SubmitLogin,
    WarmSession,
}

impl LoginStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchLoginForm => "fetch_login_form",
            Self::Encrypt => "encrypt",
            Self::SubmitLogin => "submit_login",
            Self::WarmSession => "warm_session",
        }
    }
}

/// One request/response pair inside a redirect chain
#[derive(Debug)]
struct HopRecord {
    url: Url,
    status: StatusCode,
    request_cookie: Option<String>,
    headers: HeaderMap,
}

/// All hops of a request plus the final body
#[derive(Debug)]
struct HopChain {
    hops: Vec<HopRecord>,
    body: String,
}

impl HopChain {
    fn final_status(&self) -> Option<StatusCode> {
        self.hops.last().map(|h| h.status)
    }
}

/// Cookies harvested by the login POST, before the session is warmed
#[derive(Debug, Default)]
struct LoginCookies {
    session: Option<String>,
    auth: Option<String>,
}

/// Turns a username/password into an authenticated [`SessionState`]
pub struct SessionAcquirer {
    endpoints: Endpoints,
    cipher: Arc<dyn PasswordCipher>,
    user_agent: String,
    timeout: Duration,
}

impl SessionAcquirer {
    /// Create an acquirer from portal configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` if the configured base URLs are invalid
    pub fn new(config: &PortalConfig, cipher: Arc<dyn PasswordCipher>) -> Result<Self> {
        Ok(Self::with_endpoints(
            Endpoints::from_config(config)?,
            cipher,
            config.user_agent.clone(),
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    pub fn with_endpoints(
        endpoints: Endpoints,
        cipher: Arc<dyn PasswordCipher>,
        user_agent: String,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoints,
            cipher,
            user_agent,
            timeout,
        }
    }

    fn build_client(&self, jar: Option<Arc<Jar>>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .gzip(true)
            .redirect(redirect::Policy::none());
        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }
        Ok(builder.build().map_err(FetchError::from_reqwest)?)
    }

    /// Run the full handshake for one user
    ///
    /// # Errors
    ///
    /// - `Error::Scrape` if the login page lacks an expected field
    /// - `Error::Login` if the password transform fails or no auth/session
    ///   cookie is issued
    /// - `Error::Fetch` on transport failures
    pub async fn acquire(&self, user_id: &str, password: &str) -> Result<SessionState> {
        let jar = Arc::new(Jar::default());
        let client = self.build_client(Some(Arc::clone(&jar)))?;

        debug!(user_id, step = LoginStep::FetchLoginForm.as_str(), "Login step");
        let form = self.fetch_login_form(&client, &jar).await?;

        debug!(user_id, step = LoginStep::Encrypt.as_str(), "Login step");
        let ciphertext = self
            .cipher
            .encrypt(password, &form.salt)
            .map_err(|e| Error::login(format!("password transform failed: {e}")))?;

        debug!(user_id, step = LoginStep::SubmitLogin.as_str(), "Login step");
        let login = self
            .submit_login(&client, &jar, &form, user_id, &ciphertext)
            .await?;

        debug!(user_id, step = LoginStep::WarmSession.as_str(), "Login step");
        let cookies = self.warm_session(login).await?;

        info!(user_id, "Authenticated against booking portal");
        Ok(SessionState::new(cookies))
    }

    async fn fetch_login_form(&self, client: &Client, jar: &Jar) -> Result<LoginForm> {
        let url = self.endpoints.login_page()?;
        let chain = self
            .traverse(client, Some(jar), None, Method::GET, url, None)
            .await?;

        match chain.final_status() {
            Some(status) if status.is_success() => {}
            Some(status) => return Err(FetchError::Status(status.as_u16()).into()),
            None => return Err(FetchError::Decode("empty hop chain".into()).into()),
        }

        Ok(LoginForm::parse(&chain.body)?)
    }

    async fn submit_login(
        &self,
        client: &Client,
        jar: &Jar,
        form: &LoginForm,
        user_id: &str,
        ciphertext: &str,
    ) -> Result<LoginCookies> {
        let url = self.endpoints.login_page()?;
        let fields = form.login_fields(user_id, ciphertext);
        let chain = self
            .traverse(client, Some(jar), None, Method::POST, url, Some(fields.as_slice()))
            .await?;

        let mut cookies = Self::harvest_login_cookies(&chain);

        // Auth cookie set on the last hop never appears in an outgoing header
        if cookies.auth.is_none() {
            let landing = self.endpoints.landing_page()?;
            cookies.auth = jar
                .cookies(&landing)
                .and_then(|v| v.to_str().ok().map(str::to_string))
                .and_then(|header| find_in_cookie_header(&header, AUTH_COOKIE));
        }

        if cookies.auth.is_none() {
            let status = chain.final_status().map(|s| s.as_u16()).unwrap_or_default();
            warn!(user_id, status, hops = chain.hops.len(), "Login did not issue auth cookie");
            return Err(Error::login(format!(
                "credentials not accepted (final status {status})"
            )));
        }

        Ok(cookies)
    }

    /// Auth from the first outgoing header carrying it, session from the first `Set-Cookie`
    fn harvest_login_cookies(chain: &HopChain) -> LoginCookies {
        let mut cookies = LoginCookies::default();

        for hop in &chain.hops {
            if cookies.auth.is_none() {
                cookies.auth = hop
                    .request_cookie
                    .as_deref()
                    .and_then(|header| find_in_cookie_header(header, AUTH_COOKIE));
            }
            // Only hops already carrying the auth cookie issue the authenticated session
            let authenticated = hop
                .request_cookie
                .as_deref()
                .is_some_and(|header| find_in_cookie_header(header, AUTH_COOKIE).is_some());
            if cookies.session.is_none() && authenticated {
                cookies.session = extract_rotated_cookie(&hop.headers, Hop::SubmitLogin);
                if cookies.session.is_some() {
                    debug!(url = %hop.url, "Captured session cookie during login");
                }
            }
        }

        cookies
    }

    async fn warm_session(&self, login: LoginCookies) -> Result<SessionCookies> {
        let auth = login
            .auth
            .ok_or_else(|| Error::login("auth cookie missing before warm-up"))?;
        let credential = SessionCookies::new(login.session.clone().unwrap_or_default(), auth.clone())
            .credential_header();

        let client = self.build_client(None)?;
        let url = self.endpoints.landing_page()?;
        let chain = self
            .traverse(&client, None, Some(&credential), Method::GET, url, None)
            .await?;

        if let Some(status) = chain.final_status() {
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()).into());
            }
        }

        let rotated = chain
            .hops
            .iter()
            .find_map(|hop| extract_rotated_cookie(&hop.headers, Hop::WarmSession));

        let session = match (rotated, login.session) {
            (Some(rotated), _) => rotated,
            (None, Some(previous)) => {
                warn!("Landing page issued no session cookie, keeping login cookie");
                previous
            }
            (None, None) => return Err(Error::login("no session cookie issued")),
        };

        Ok(SessionCookies::new(session, auth))
    }

    /// Send a request and follow redirects by hand, recording every hop
    ///
    /// With a `jar`, cookies are attached and stored by the client itself and
    /// the recorded outgoing header is read back from the jar. With
    /// `fixed_cookie`, exactly that header is sent on every hop.
    async fn traverse(
        &self,
        client: &Client,
        jar: Option<&Jar>,
        fixed_cookie: Option<&str>,
        mut method: Method,
        mut url: Url,
        mut form: Option<&[(&'static str, &str)]>,
    ) -> Result<HopChain> {
        let headers = build_login_headers(&self.user_agent);
        let mut hops = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let request_cookie = match (fixed_cookie, jar) {
                (Some(cookie), _) => Some(cookie.to_string()),
                (None, Some(jar)) => jar
                    .cookies(&url)
                    .and_then(|v| v.to_str().ok().map(str::to_string)),
                (None, None) => None,
            };

            let mut request = client
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(cookie) = fixed_cookie {
                request = request.header(COOKIE, cookie);
            }
            if let Some(fields) = form {
                request = request.form(fields);
            }

            let response = request.send().await.map_err(FetchError::from_reqwest)?;
            let status = response.status();
            let response_headers = response.headers().clone();

            debug!(%url, status = status.as_u16(), "Hop");

            let next = if status.is_redirection() {
                response_headers
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|location| {
                        url.join(location)
                            .map_err(|e| FetchError::InvalidUrl(format!("{location}: {e}")))
                    })
                    .transpose()?
            } else {
                None
            };

            hops.push(HopRecord {
                url: url.clone(),
                status,
                request_cookie,
                headers: response_headers,
            });

            match next {
                Some(next_url) => {
                    if matches!(
                        status,
                        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
                    ) {
                        method = Method::GET;
                        form = None;
                    }
                    url = next_url;
                }
                None => {
                    let body = response.text().await.map_err(FetchError::from_reqwest)?;
                    return Ok(HopChain { hops, body });
                }
            }
        }

        Err(FetchError::TooManyRedirects(MAX_REDIRECTS).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, SET_COOKIE};

    fn hop(url: &str, request_cookie: Option<&str>, set_cookies: &[&str]) -> HopRecord {
        let mut headers = HeaderMap::new();
        for c in set_cookies {
            headers.append(SET_COOKIE, HeaderValue::from_str(c).unwrap());
        }
        HopRecord {
            url: Url::parse(url).unwrap(),
            status: StatusCode::FOUND,
            request_cookie: request_cookie.map(str::to_string),
            headers,
        }
    }

    #[test]
    fn test_harvest_first_session_cookie_wins() {
        let chain = HopChain {
            hops: vec![
                hop("https://auth.example/login", Some("JSESSIONID=j"), &["CASTGC=tgc; Path=/"]),
                hop(
                    "https://portal.example/index.do?ticket=ST-1",
                    None,
                    &["MOD_AUTH_CAS=ST-1; Path=/"],
                ),
                hop(
                    "https://portal.example/index.do",
                    Some("MOD_AUTH_CAS=ST-1"),
                    &["_WEU=first; Path=/", "_WEU=second; Path=/"],
                ),
                hop(
                    "https://portal.example/index.do",
                    Some("MOD_AUTH_CAS=ST-1; _WEU=first"),
                    &["_WEU=later; Path=/"],
                ),
            ],
            body: String::new(),
        };

        let cookies = SessionAcquirer::harvest_login_cookies(&chain);
        assert_eq!(cookies.auth.as_deref(), Some("ST-1"));
        assert_eq!(cookies.session.as_deref(), Some("first"));
    }

    #[test]
    fn test_harvest_skips_session_cookie_set_before_auth() {
        let chain = HopChain {
            hops: vec![
                hop("https://auth.example/login", Some("JSESSIONID=j"), &["CASTGC=tgc; Path=/"]),
                hop(
                    "https://portal.example/index.do?ticket=ST-1",
                    None,
                    &["_WEU=preauth; Path=/", "MOD_AUTH_CAS=ST-1; Path=/"],
                ),
                hop(
                    "https://portal.example/index.do",
                    Some("_WEU=preauth; MOD_AUTH_CAS=ST-1"),
                    &["_WEU=authed; Path=/"],
                ),
            ],
            body: String::new(),
        };

        let cookies = SessionAcquirer::harvest_login_cookies(&chain);
        assert_eq!(cookies.auth.as_deref(), Some("ST-1"));
        assert_eq!(cookies.session.as_deref(), Some("authed"));
    }

    #[test]
    fn test_harvest_without_auth() {
        let chain = HopChain {
            hops: vec![hop("https://auth.example/login", Some("JSESSIONID=j"), &[])],
            body: String::new(),
        };

        let cookies = SessionAcquirer::harvest_login_cookies(&chain);
        assert!(cookies.auth.is_none());
        assert!(cookies.session.is_none());
    }

    #[test]
    fn test_login_step_labels() {
        assert_eq!(LoginStep::FetchLoginForm.as_str(), "fetch_login_form");
        assert_eq!(LoginStep::WarmSession.as_str(), "warm_session");
    }
}
