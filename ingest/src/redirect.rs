//! Redirect resolution: follow a client's sending domain to its canonical
//! marketing URL, used as disambiguating signal for company-code inference.

use std::time::Duration;

pub struct RedirectResolver {
    http: reqwest::Client,
}

impl RedirectResolver {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { http })
    }

    /// Resolves a bare domain to the final URL after following redirects.
    ///
    /// Tries HEAD first; falls back to GET when HEAD fails or is rejected
    /// (some servers answer 4xx/5xx to HEAD but serve GET fine). Returns an
    /// empty string when both attempts fail; absence of a result is a valid
    /// business outcome, never an error.
    pub async fn resolve(&self, domain: &str) -> String {
        if domain.is_empty() {
            return String::new();
        }
        let url = format!("http://{domain}");

        match self.http.head(&url).send().await {
            Ok(response) if !response.status().is_client_error()
                && !response.status().is_server_error() =>
            {
                return response.url().to_string();
            }
            Ok(response) => {
                tracing::debug!(domain, status = %response.status(), "HEAD rejected, trying GET");
            }
            Err(error) => {
                tracing::debug!(domain, %error, "HEAD failed, trying GET");
            }
        }

        match self.http.get(&url).send().await {
            Ok(response) => response.url().to_string(),
            Err(error) => {
                tracing::debug!(domain, %error, "redirect resolution failed");
                String::new()
            }
        }
    }
}
