//! URLs of the identity provider and the venue booking application

use url::Url;

use crate::config::PortalConfig;
use crate::utils::error::FetchError;

/// Application root under the portal host
const APP_PREFIX: &str = "/qljfwapp/sys/lwSzuCgyy";

/// Resolved endpoint set for one deployment
#[derive(Debug, Clone)]
pub struct Endpoints {
    auth_base: Url,
    portal_base: Url,
}

impl Endpoints {
    /// Create endpoints from base URLs
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if either base cannot be parsed
    pub fn new(auth_base: &str, portal_base: &str) -> Result<Self, FetchError> {
        let parse = |s: &str| Url::parse(s).map_err(|e| FetchError::InvalidUrl(format!("{s}: {e}")));
        Ok(Self {
            auth_base: parse(auth_base)?,
            portal_base: parse(portal_base)?,
        })
    }

    pub fn from_config(config: &PortalConfig) -> Result<Self, FetchError> {
        Self::new(&config.auth_base_url, &config.portal_base_url)
    }

    fn auth(&self, path: &str) -> Result<Url, FetchError> {
        self.auth_base
            .join(path)
            .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))
    }

    fn app(&self, path: &str) -> Result<Url, FetchError> {
        let full = format!("{APP_PREFIX}{path}");
        self.portal_base
            .join(&full)
            .map_err(|e| FetchError::InvalidUrl(format!("{full}: {e}")))
    }

    /// Service URL the identity provider redirects back to after login
    pub fn service_url(&self) -> Result<String, FetchError> {
        Ok(format!("{}#/sportVenue", self.landing_page()?))
    }

    /// Login page (GET) and login form target (POST)
    pub fn login_page(&self) -> Result<Url, FetchError> {
        let mut url = self.auth("/authserver/login")?;
        url.query_pairs_mut()
            .append_pair("service", &self.service_url()?);
        Ok(url)
    }

    /// Application landing page used to warm the session
    pub fn landing_page(&self) -> Result<Url, FetchError> {
        self.app("/index.do")
    }

    /// Referer sent with API calls
    pub fn referer(&self) -> Result<Url, FetchError> {
        self.landing_page()
    }

    pub fn time_list(&self) -> Result<Url, FetchError> {
        self.app("/sportVenue/getTimeList.do")
    }

    pub fn opening_rooms(&self) -> Result<Url, FetchError> {
        self.app("/modules/sportVenue/getOpeningRoom.do")
    }

    pub fn order_number(&self) -> Result<Url, FetchError> {
        self.app("/sportVenue/getOrderNum.do")
    }

    pub fn booking(&self) -> Result<Url, FetchError> {
        self.app("/sportVenue/insertVenueBookingInfo.do")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://authserver.szu.edu.cn", "https://ehall.szu.edu.cn").unwrap()
    }

    #[test]
    fn test_login_page_carries_encoded_service() {
        let url = endpoints().login_page().unwrap();
        assert_eq!(url.path(), "/authserver/login");

        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "service");
        assert_eq!(
            value,
            "https://ehall.szu.edu.cn/qljfwapp/sys/lwSzuCgyy/index.do#/sportVenue"
        );
        assert!(url.as_str().contains("%23%2FsportVenue"));
    }

    #[test]
    fn test_api_paths() {
        let e = endpoints();
        assert_eq!(
            e.time_list().unwrap().as_str(),
            "https://ehall.szu.edu.cn/qljfwapp/sys/lwSzuCgyy/sportVenue/getTimeList.do"
        );
        assert_eq!(
            e.opening_rooms().unwrap().path(),
            "/qljfwapp/sys/lwSzuCgyy/modules/sportVenue/getOpeningRoom.do"
        );
        assert_eq!(
            e.order_number().unwrap().path(),
            "/qljfwapp/sys/lwSzuCgyy/sportVenue/getOrderNum.do"
        );
        assert_eq!(
            e.booking().unwrap().path(),
            "/qljfwapp/sys/lwSzuCgyy/sportVenue/insertVenueBookingInfo.do"
        );
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            Endpoints::new("not a url", "https://ehall.szu.edu.cn"),
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
