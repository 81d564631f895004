use career_crawler_core::{domain_of, NormalizedJob, SelectorPlan};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extract job postings from `html` using a previously-learned `SelectorPlan`.
///
/// Never fails: an empty/missing `job_list_selector`, a malformed selector,
/// or zero matches all produce an empty `Vec` rather than an error — a bad
/// cached plan should fall through to the LLM, not crash the crawl.
pub fn extract_with_selectors(html: &str, plan: &SelectorPlan, base_url: &str) -> Vec<NormalizedJob> {
    let Some(job_list_sel) = parse_selector(&plan.job_list_selector) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let domain = domain_of(base_url);

    document
        .select(&job_list_sel)
        .filter_map(|card| extract_card(card, plan, base_url, &domain))
        .collect()
}

fn extract_card(
    card: ElementRef,
    plan: &SelectorPlan,
    base_url: &str,
    domain: &str,
) -> Option<NormalizedJob> {
    let title = select_text(card, plan.title_selector.as_deref())?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let company = select_text(card, plan.company_selector.as_deref())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| domain.to_string());

    let location = select_text(card, plan.location_selector.as_deref()).map(|s| s.trim().to_string());
    let salary_range = select_text(card, plan.salary_selector.as_deref()).map(|s| s.trim().to_string());
    let source_url = resolve_href(card, plan.url_selector.as_deref(), base_url).unwrap_or_default();

    Some(NormalizedJob {
        source_site: domain.to_string(),
        source_url,
        search_keyword: String::new(),
        title,
        company,
        location,
        salary_range,
        description: Some(String::new()),
        posted_date: None,
    })
}

fn select_text(card: ElementRef, selector: Option<&str>) -> Option<String> {
    let sel = parse_selector(selector?)?;
    let el = card.select(&sel).next()?;
    Some(el.text().collect::<String>())
}

fn resolve_href(card: ElementRef, selector: Option<&str>, base_url: &str) -> Option<String> {
    let sel = parse_selector(selector?)?;
    let el = card.select(&sel).next()?;
    let href = el.value().attr("href")?;

    if href.starts_with("http") {
        Some(href.to_string())
    } else if let Some(stripped) = href.strip_prefix('/') {
        let base = Url::parse(base_url).ok()?;
        Some(format!("{}://{}/{}", base.scheme(), base.host_str()?, stripped))
    } else {
        None
    }
}

fn parse_selector(raw: &str) -> Option<Selector> {
    if raw.trim().is_empty() {
        return None;
    }
    Selector::parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SelectorPlan {
        SelectorPlan {
            job_list_selector: ".job-card".to_string(),
            title_selector: Some(".title".to_string()),
            company_selector: Some(".company".to_string()),
            location_selector: Some(".location".to_string()),
            url_selector: Some("a".to_string()),
            salary_selector: Some(".salary".to_string()),
        }
    }

    const HTML: &str = r#"
        <div class="job-card">
            <h2 class="title">Senior Engineer</h2>
            <span class="company">Acme Corp</span>
            <span class="location">Remote</span>
            <span class="salary">$150k</span>
            <a href="/jobs/42">apply</a>
        </div>
        <div class="job-card">
            <h2 class="title">   </h2>
            <a href="https://acme.example/jobs/43">apply</a>
        </div>
    "#;

    #[test]
    fn extracts_full_card() {
        let jobs = extract_with_selectors(HTML, &plan(), "https://acme.example/careers");
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "Senior Engineer");
        assert_eq!(job.company, "Acme Corp");
        assert_eq!(job.location.as_deref(), Some("Remote"));
        assert_eq!(job.salary_range.as_deref(), Some("$150k"));
        assert_eq!(job.source_url, "https://acme.example/jobs/42");
    }

    #[test]
    fn blank_title_skips_card() {
        let jobs = extract_with_selectors(HTML, &plan(), "https://acme.example/careers");
        assert!(jobs.iter().all(|j| j.title != ""));
    }

    #[test]
    fn missing_company_defaults_to_host() {
        let plan = SelectorPlan {
            company_selector: None,
            ..plan()
        };
        let jobs = extract_with_selectors(HTML, &plan, "https://acme.example/careers");
        assert_eq!(jobs[0].company, "acme.example");
    }

    #[test]
    fn empty_job_list_selector_returns_nothing() {
        let plan = SelectorPlan {
            job_list_selector: "".to_string(),
            ..plan()
        };
        assert!(extract_with_selectors(HTML, &plan, "https://acme.example").is_empty());
    }

    #[test]
    fn malformed_selector_produces_empty_result_not_panic() {
        let plan = SelectorPlan {
            job_list_selector: ":::not-a-selector".to_string(),
            ..plan()
        };
        assert!(extract_with_selectors(HTML, &plan, "https://acme.example").is_empty());
    }

    #[test]
    fn relative_href_without_leading_slash_is_left_empty() {
        let html = r#"<div class="job-card"><h2 class="title">Eng</h2><a href="jobs/1">x</a></div>"#;
        let jobs = extract_with_selectors(html, &plan(), "https://acme.example/careers");
        assert_eq!(jobs[0].source_url, "");
    }
}
