//! CDS Sesame name resolver.
//!
//! Queries `<base>/-oI/A?<identifier>` and reads the `%J` line of the plain
//! text answer, which carries J2000 RA/Dec in decimal degrees:
//!
//! ```text
//! # M82  #Q1234
//! #=Sc=Simbad (via url):    1
//! %J 148.96845833 +69.67970278 = 09:55:52.43 +69:40:46.9
//! ```

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use super::NameResolver;
use crate::error::{PlannerError, PlannerResult};
use crate::models::Coordinate;

#[derive(Debug, Clone)]
pub struct SesameNameResolver {
    client: Client,
    base_url: String,
}

impl SesameNameResolver {
    pub fn new(base_url: &str, timeout: Duration) -> PlannerResult<Self> {
        Url::parse(base_url).map_err(|e| {
            PlannerError::Configuration(format!("invalid Sesame URL '{}': {}", base_url, e))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("observing-suite/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlannerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn query_url(&self, identifier: &str) -> PlannerResult<Url> {
        let mut url = Url::parse(&format!("{}/-oI/A", self.base_url))
            .map_err(|e| PlannerError::Configuration(e.to_string()))?;
        url.set_query(Some(identifier));
        Ok(url)
    }
}

/// Extract the J2000 position from a Sesame text answer.
pub fn parse_sesame_response(identifier: &str, body: &str) -> PlannerResult<Coordinate> {
    let line = body
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("%J"))
        .ok_or_else(|| PlannerError::NameNotResolved(identifier.to_string()))?;

    let mut fields = line.trim_start_matches("%J").split_whitespace();
    let mut next_number = || -> PlannerResult<f64> {
        fields
            .next()
            .and_then(|f| f.parse::<f64>().ok())
            .ok_or_else(|| {
                PlannerError::Network(format!("malformed Sesame answer for '{}': {}", identifier, line))
            })
    };
    let ra = next_number()?;
    let dec = next_number()?;
    Coordinate::from_degrees(ra, dec)
}

#[async_trait]
impl NameResolver for SesameNameResolver {
    async fn lookup(&self, identifier: &str) -> PlannerResult<Coordinate> {
        let url = self.query_url(identifier)?;
        log::debug!("Sesame query: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PlannerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlannerError::Network(format!(
                "Sesame answered HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlannerError::Network(e.to_string()))?;
        parse_sesame_response(identifier, &body)
    }

    fn service_name(&self) -> &'static str {
        "sesame"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_found() {
        let body = "# M82\t#Q12345\n#=Sc=Simbad (via url):    1\n%@ 1234\n%J 148.96845833 +69.67970278 = 09:55:52.43 +69:40:46.9\n%I.0 M 82\n";
        let c = parse_sesame_response("M82", body).unwrap();
        assert!((c.ra_deg() - 148.96845833).abs() < 1e-9);
        assert!((c.dec_deg() - 69.67970278).abs() < 1e-9);
    }

    #[test]
    fn test_parse_not_found() {
        let body = "# nonsense\t#Q1\n#! *** Nothing found *** \n";
        assert_eq!(
            parse_sesame_response("nonsense", body).unwrap_err(),
            PlannerError::NameNotResolved("nonsense".into())
        );
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_sesame_response("M82", "%J abc def").unwrap_err();
        assert!(matches!(err, PlannerError::Network(_)));
    }

    #[test]
    fn test_query_url() {
        let resolver =
            SesameNameResolver::new("https://cds.unistra.fr/cgi-bin/nph-sesame/", Duration::from_secs(5)).unwrap();
        let url = resolver.query_url("NGC 4993").unwrap();
        assert_eq!(url.as_str(), "https://cds.unistra.fr/cgi-bin/nph-sesame/-oI/A?NGC%204993");
    }
}
