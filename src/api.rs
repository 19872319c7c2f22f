use crate::calendar::{GridBuilder, WeekStart};
use crate::compose::{ComposeError, GraphRequest, compose};
use crate::fetch::{ActivityFetcher, FetchError};
use percent_encoding::percent_decode_str;
use serde_json::{Value, json};
use time::OffsetDateTime;
use url::Url;

static MISSING_PARAMS: &str = "Missing username or year";

/// Origin against which request targets are resolved
static BASE_URL: &str = "http://localhost/";

/// Status code and JSON body of a response at the HTTP boundary
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ApiResponse {
    pub(crate) status: u16,
    pub(crate) body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> ApiResponse {
        ApiResponse { status: 200, body }
    }

    fn message(status: u16, message: String) -> ApiResponse {
        ApiResponse {
            status,
            body: json!({ "message": message }),
        }
    }

    fn missing_params() -> ApiResponse {
        ApiResponse {
            status: 400,
            body: json!({ "error": MISSING_PARAMS }),
        }
    }
}

/// Dispatch a request target such as `/api/graph?username=octocat&year=2024`
/// or `/api/octocat`
pub(crate) fn route<F: ActivityFetcher>(
    fetcher: &F,
    target: &str,
    now: OffsetDateTime,
) -> ApiResponse {
    let url = match Url::parse(BASE_URL)
        .and_then(|base| Url::options().base_url(Some(&base)).parse(target))
    {
        Ok(url) => url,
        Err(e) => return ApiResponse::message(400, format!("Invalid request target: {e}")),
    };
    let params = Params::from_url(&url);
    tracing::debug!(path = url.path(), query = url.query(), "Routing API request");
    let segments = url
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();
    match segments.as_slice() {
        ["api", "graph"] => graph(fetcher, &params, now),
        ["api", "repos"] => repos(fetcher, &params, now),
        ["api", username] => match percent_decode_str(username).decode_utf8() {
            Ok(username) => user_graph(fetcher, &username, &params, now),
            Err(_) => ApiResponse::message(400, format!("Invalid username: {username}")),
        },
        _ => ApiResponse::message(404, format!("No such endpoint: {}", url.path())),
    }
}

/// Every year of a user's activity as a whole graph model
fn user_graph<F: ActivityFetcher>(
    fetcher: &F,
    username: &str,
    params: &Params,
    now: OffsetDateTime,
) -> ApiResponse {
    let request = GraphRequest::new(username, now).week_start(params.week_start());
    match compose(fetcher, &request) {
        Ok(model) => match serde_json::to_value(&model) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => ApiResponse::message(500, e.to_string()),
        },
        Err(e) => error_response(&e),
    }
}

fn graph<F: ActivityFetcher>(fetcher: &F, params: &Params, now: OffsetDateTime) -> ApiResponse {
    let (username, year) = match params.username_and_year() {
        Ok(uy) => uy,
        Err(r) => return r,
    };
    let request = GraphRequest::new(username, now)
        .years([year])
        .week_start(params.week_start());
    match compose(fetcher, &request) {
        Ok(model) => match model.years.first().map(serde_json::to_value) {
            Some(Ok(body)) => ApiResponse::ok(body),
            Some(Err(e)) => ApiResponse::message(500, e.to_string()),
            None => ApiResponse::message(500, String::from("No data for year")),
        },
        Err(e) => error_response(&e),
    }
}

fn repos<F: ActivityFetcher>(fetcher: &F, params: &Params, now: OffsetDateTime) -> ApiResponse {
    let (username, year) = match params.username_and_year() {
        Ok(uy) => uy,
        Err(r) => return r,
    };
    match GridBuilder::new(WeekStart::default(), now).check_year(year) {
        Ok(_) => match fetcher.fetch_repos_created_in_year(username, year) {
            Ok(n) => ApiResponse::ok(json!(n)),
            Err(e) => fetch_error_response(&e),
        },
        Err(e) => ApiResponse::message(400, e.to_string()),
    }
}

fn error_response(e: &ComposeError) -> ApiResponse {
    if let Some(source) = e.fetch_error() {
        return fetch_error_response(source);
    }
    match e {
        ComposeError::InvalidYear(_) => ApiResponse::message(400, e.to_string()),
        ComposeError::NoYears => ApiResponse::message(404, e.to_string()),
        _ => ApiResponse::message(500, e.to_string()),
    }
}

fn fetch_error_response(e: &FetchError) -> ApiResponse {
    match e {
        FetchError::UserNotFound(_) => ApiResponse::message(404, e.to_string()),
        FetchError::RateLimited { retry_after } => {
            let mut r = ApiResponse::message(429, e.to_string());
            if let Some(d) = retry_after {
                r.body["retryAfter"] = json!(d.as_secs());
            }
            r
        }
        FetchError::Network(_) => ApiResponse::message(502, e.to_string()),
    }
}

/// Decoded query parameters of a request target
#[derive(Clone, Debug, Eq, PartialEq)]
struct Params(Vec<(String, String)>);

impl Params {
    fn from_url(url: &Url) -> Params {
        Params(
            url.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    /// Returns the first non-empty value for `key`
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .next()
    }

    fn username_and_year(&self) -> Result<(&str, i32), ApiResponse> {
        let (Some(username), Some(year)) = (self.get("username"), self.get("year")) else {
            return Err(ApiResponse::missing_params());
        };
        match year.trim().parse::<i32>() {
            Ok(y) => Ok((username, y)),
            Err(_) => Err(ApiResponse::message(400, format!("Invalid year: {year}"))),
        }
    }

    fn week_start(&self) -> WeekStart {
        if self
            .get("weekStart")
            .is_some_and(|v| v.eq_ignore_ascii_case("monday"))
        {
            WeekStart::Monday
        } else {
            WeekStart::Sunday
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{DailyCount, SnapshotFetcher};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-12-01 0:00 UTC);

    static SNAPSHOT: &str = r#"{
        "username": "octocat",
        "contributions": [
            {"date": "2024-01-01", "count": 3},
            {"date": "2024-07-04", "count": 12}
        ],
        "reposCreated": {"2024": 2}
    }"#;

    #[derive(Debug)]
    struct DownFetcher;

    impl ActivityFetcher for DownFetcher {
        fn fetch_daily_counts(&self, _: &str, _: i32) -> Result<Vec<DailyCount>, FetchError> {
            Err(FetchError::Network("connection reset".into()))
        }

        fn fetch_repos_created_in_year(&self, _: &str, _: i32) -> Result<u32, FetchError> {
            Err(FetchError::RateLimited { retry_after: None })
        }

        fn contribution_years(&self, _: &str) -> Result<Vec<i32>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn fetcher() -> SnapshotFetcher {
        SnapshotFetcher::from_json(SNAPSHOT).unwrap()
    }

    #[test]
    fn test_graph_ok() {
        let r = route(&fetcher(), "/api/graph?username=octocat&year=2024", NOW);
        assert_eq!(r.status, 200);
        assert_eq!(r.body["year"], 2024);
        assert_eq!(r.body["totalContributions"], 15);
        assert_eq!(r.body["reposCreated"], 2);
    }

    #[test]
    fn test_graph_monday() {
        let r = route(
            &fetcher(),
            "/api/graph?username=octocat&year=2024&weekStart=monday",
            NOW,
        );
        assert_eq!(r.body["weekStart"], "monday");
        assert_eq!(r.body["weeks"][0][0]["date"], "2024-01-01");
    }

    #[test]
    fn test_missing_params() {
        for target in [
            "/api/graph",
            "/api/graph?username=octocat",
            "/api/graph?year=2024",
            "/api/repos?username=&year=2024",
        ] {
            let r = route(&fetcher(), target, NOW);
            assert_eq!(r.status, 400, "{target} should be rejected");
            assert_eq!(r.body, json!({"error": "Missing username or year"}));
        }
    }

    #[test]
    fn test_bad_year() {
        let r = route(&fetcher(), "/api/graph?username=octocat&year=twenty", NOW);
        assert_eq!(r.status, 400);
        assert_eq!(r.body, json!({"message": "Invalid year: twenty"}));
        let r = route(&fetcher(), "/api/graph?username=octocat&year=1999", NOW);
        assert_eq!(r.status, 400);
    }

    #[test]
    fn test_unknown_user() {
        let r = route(&fetcher(), "/api/graph?username=hubot&year=2024", NOW);
        assert_eq!(r.status, 404);
        assert_eq!(r.body, json!({"message": "user \"hubot\" not found"}));
    }

    #[test]
    fn test_collaborator_failures() {
        let r = route(&DownFetcher, "/api/graph?username=a&year=2024", NOW);
        assert_eq!(r.status, 502);
        let r = route(&DownFetcher, "/api/repos?username=a&year=2024", NOW);
        assert_eq!(r.status, 429);
    }

    #[test]
    fn test_retry_after() {
        let r = fetch_error_response(&FetchError::RateLimited {
            retry_after: Some(std::time::Duration::from_secs(60)),
        });
        assert_eq!(
            r.body,
            json!({"message": "rate limited by the activity source", "retryAfter": 60})
        );
    }

    #[test]
    fn test_repos() {
        let r = route(&fetcher(), "/api/repos?username=octocat&year=2024", NOW);
        assert_eq!(r, ApiResponse::ok(json!(2)));
    }

    #[test]
    fn test_unknown_endpoint() {
        for target in ["/", "/status", "/api", "/api/graph/extra"] {
            let r = route(&fetcher(), target, NOW);
            assert_eq!(r.status, 404, "{target} should not be routed");
        }
    }

    #[test]
    fn test_encoded_query_values() {
        let fetcher = SnapshotFetcher::from_json(
            r#"{"username": "octo-cat", "contributions": [{"date": "2024-02-02", "count": 4}]}"#,
        )
        .unwrap();
        let r = route(&fetcher, "/api/graph?username=octo%2Dcat&year=2024", NOW);
        assert_eq!(r.status, 200);
        assert_eq!(r.body["totalContributions"], 4);
        let r = route(&fetcher, "/api/repos?username=octo-cat&year=%32024", NOW);
        assert_eq!(r, ApiResponse::ok(json!(0)));
        let r = route(&fetcher, "/api/graph?username=+&year=2024", NOW);
        assert_eq!(r.status, 404);
    }

    #[test]
    fn test_user_graph() {
        let r = route(&fetcher(), "/api/octocat", NOW);
        assert_eq!(r.status, 200);
        assert_eq!(r.body["username"], "octocat");
        assert_eq!(r.body["generatedAt"], "2024-12-01T00:00:00Z");
        let data = r.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["year"], 2024);
        assert_eq!(data[0]["totalContributions"], 15);
        assert_eq!(data[0]["reposCreated"], 2);
        assert_eq!(data[0]["weekStart"], "sunday");
    }

    #[test]
    fn test_user_graph_options() {
        let r = route(&fetcher(), "/api/octo%63at/?weekStart=Monday", NOW);
        assert_eq!(r.status, 200);
        assert_eq!(r.body["data"][0]["weekStart"], "monday");
    }

    #[test]
    fn test_user_graph_errors() {
        let r = route(&fetcher(), "/api/hubot", NOW);
        assert_eq!(r, ApiResponse::message(404, "user \"hubot\" not found".into()));
        let ghost = SnapshotFetcher::from_json(r#"{"username": "ghost"}"#).unwrap();
        assert_eq!(route(&ghost, "/api/ghost", NOW).status, 404);
        let r = route(&DownFetcher, "/api/octocat", NOW);
        assert_eq!(r.status, 404);
    }
}
