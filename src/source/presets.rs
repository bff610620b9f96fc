//! Built-in adapters for the supported job sites

use super::{DetailSelectors, ListingSelectors, LoginProcedure, LoginStep, Pagination, SourceAdapter};
use crate::extract::{ContentSlice, Locator};

/// Names accepted by [`preset`]
pub const PRESET_NAMES: &[&str] = &["linkedin", "indeed", "glints"];

/// Looks up a built-in adapter by case-insensitive name
pub fn preset(name: &str) -> Option<SourceAdapter> {
    match name.to_ascii_lowercase().as_str() {
        "linkedin" => Some(linkedin()),
        "indeed" => Some(indeed()),
        "glints" => Some(glints()),
        _ => None,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// LinkedIn's public (guest) job search
pub fn linkedin() -> SourceAdapter {
    SourceAdapter {
        name: "LinkedIn".to_string(),
        base_url: "https://www.linkedin.com".to_string(),
        search_url: "https://www.linkedin.com/jobs/search?keywords={title}&location={location}{remote}"
            .to_string(),
        search_splitter: "%20".to_string(),
        remote_filter: "&f_WT=2".to_string(),
        strip_query: true,
        listing: ListingSelectors {
            results_ready: ".jobs-search__results-list".to_string(),
            result_item: strings(&[".jobs-search__results-list > li", "li"]),
            link: vec![
                Locator::attr("a.base-card__full-link", "href"),
                Locator::attr("a[href*='/jobs/view/']", "href"),
            ],
            title: vec![
                Locator::text(".base-search-card__title"),
                Locator::text("h3"),
            ],
            company: vec![
                Locator::text(".base-search-card__subtitle"),
                Locator::text("h4"),
            ],
            location: vec![Locator::text(".job-search-card__location")],
            date_posted: vec![Locator::attr("time", "datetime"), Locator::text("time")],
        },
        pagination: Pagination::InfiniteScroll,
        detail: DetailSelectors {
            ready: None,
            description: vec![
                Locator::block(".show-more-less-html__markup"),
                Locator::block(".description__text"),
            ],
            fallback: None,
        },
        login: None,
    }
}

/// Indeed's paginated search
pub fn indeed() -> SourceAdapter {
    SourceAdapter {
        name: "Indeed".to_string(),
        base_url: "https://www.indeed.com".to_string(),
        search_url: "https://www.indeed.com/jobs?q={title}&l={location}{remote}".to_string(),
        search_splitter: "+".to_string(),
        remote_filter: "&remotejob=032b3046-06a3-4876-8dfd-474eb5e7ed11".to_string(),
        strip_query: false,
        listing: ListingSelectors {
            results_ready: ".job_seen_beacon".to_string(),
            result_item: strings(&[".job_seen_beacon"]),
            link: vec![
                Locator::attr("h2.jobTitle a", "href"),
                Locator::attr("a.jcs-JobTitle", "href"),
            ],
            title: vec![
                Locator::text("h2.jobTitle span"),
                Locator::text("h2.jobTitle"),
            ],
            company: vec![
                Locator::text(".companyName"),
                Locator::text("[data-testid='company-name']"),
            ],
            location: vec![
                Locator::text(".companyLocation"),
                Locator::text("[data-testid='text-location']"),
            ],
            date_posted: vec![Locator::text("[data-testid='text-date']"), Locator::text(".date")],
        },
        pagination: Pagination::NextButton {
            selector: "a[aria-label='Next']".to_string(),
        },
        detail: DetailSelectors {
            ready: None,
            description: vec![
                Locator::block("#jobDescriptionText"),
                Locator::block(".jobsearch-JobComponent-description"),
            ],
            fallback: None,
        },
        login: None,
    }
}

/// Glints Indonesia, with email login
///
/// Detail pages have no stable description container, so the description is
/// sliced out of the main content between two boilerplate headings. The
/// search form has no free-text location, so `{location}` is not used.
pub fn glints() -> SourceAdapter {
    SourceAdapter {
        name: "Glints".to_string(),
        base_url: "https://glints.com".to_string(),
        search_url: "https://glints.com/id/opportunities/jobs/explore?keyword={title}&country=ID\
                     &locationName=All+Cities%2FProvinces&lowestLocationLevel=1{remote}"
            .to_string(),
        search_splitter: "+".to_string(),
        remote_filter: "&remote=true".to_string(),
        strip_query: true,
        listing: ListingSelectors {
            results_ready: "div[class*='CompactOpportunityCard']".to_string(),
            result_item: strings(&[
                "div[class*='CompactOpportunityCard']",
                "a[href*='/opportunities/jobs/']",
            ]),
            link: vec![
                Locator::own_attr("href"),
                Locator::attr("h2 a", "href"),
                Locator::attr("a[href*='/opportunities/jobs/']", "href"),
            ],
            title: vec![Locator::text("h2 a"), Locator::own_first_line()],
            company: vec![Locator::text("a[href*='/companies/']")],
            location: vec![Locator::text("div[class*='CardJobLocation']")],
            date_posted: Vec::new(),
        },
        pagination: Pagination::InfiniteScroll,
        detail: DetailSelectors {
            ready: None,
            description: Vec::new(),
            fallback: Some(ContentSlice {
                containers: strings(&["main", "div#__next"]),
                start_marker: Some("Deskripsi pekerjaan".to_string()),
                end_marker: Some("Tentang Perusahaan".to_string()),
                max_chars: 2000,
            }),
        },
        login: Some(LoginProcedure {
            steps: vec![
                LoginStep::Navigate {
                    url: "/id/opportunities/jobs/explore".to_string(),
                },
                LoginStep::ClickText {
                    selector: "button".to_string(),
                    texts: strings(&["Masuk", "Login"]),
                },
                LoginStep::WaitFor {
                    selector: "div[role='dialog']".to_string(),
                },
                LoginStep::ClickText {
                    selector: "a".to_string(),
                    texts: strings(&["Email"]),
                },
                LoginStep::Fill {
                    selector: "#login-form-email".to_string(),
                    env: "GLINTS_EMAIL".to_string(),
                },
                LoginStep::Fill {
                    selector: "#login-form-password".to_string(),
                    env: "GLINTS_PASSWORD".to_string(),
                },
                LoginStep::Click {
                    selectors: strings(&[
                        "#login-signup-modal form button[type='submit']",
                        "#login-signup-modal form button",
                    ]),
                },
                LoginStep::Pause { millis: 5_000 },
            ],
            step_timeout_ms: 5_000,
        }),
    }
}
