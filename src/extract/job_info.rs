use crate::browser::driver::{Driver, Scope};
use crate::browser::selector::{Selector, SelectorList};
use crate::form::normalize::collapse_whitespace;

pub const UNKNOWN_POSITION: &str = "Unknown Position";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

const MAX_TITLE_CHARS: usize = 200;
const APPLICATION_PREFIX: &str = "Job Application for ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub title: String,
    pub company: String,
}

/// Job title and company from the page, searched in `scope` (the form's
/// document) and then the top-level page. Never fails.
pub fn job_info<D: Driver + ?Sized>(driver: &mut D, scope: Scope) -> JobInfo {
    let page_title = driver.title().unwrap_or_default();
    let mut scopes = vec![scope];
    if scope != Scope::Page {
        scopes.push(Scope::Page);
    }
    JobInfo {
        title: job_title(driver, &scopes, &page_title),
        company: company(driver, &scopes, &page_title),
    }
}

fn first_text<D: Driver + ?Sized>(driver: &mut D, scopes: &[Scope], selector: &SelectorList) -> Option<String> {
    for &scope in scopes {
        let Ok(nodes) = driver.query_all(scope, selector) else {
            continue;
        };
        for node in nodes {
            let text = driver.text_content(node).map(|t| collapse_whitespace(&t)).unwrap_or_default();
            if !text.is_empty() && text.chars().count() < MAX_TITLE_CHARS {
                return Some(text);
            }
        }
    }
    None
}

fn job_title<D: Driver + ?Sized>(driver: &mut D, scopes: &[Scope], page_title: &str) -> String {
    let selectors = [
        SelectorList::from(Selector::tag("h1")),
        SelectorList::from(Selector::any().class("job-title")),
        SelectorList::from(Selector::any().attr_eq("data-testid", "job-title")),
    ];
    for selector in &selectors {
        if let Some(title) = first_text(driver, scopes, selector) {
            return title;
        }
    }
    if let Some(title) = title_from_application_heading(page_title) {
        return title;
    }
    let trimmed = page_title.trim();
    if !trimmed.is_empty() && trimmed.chars().count() < MAX_TITLE_CHARS {
        return trimmed.to_string();
    }
    UNKNOWN_POSITION.to_string()
}

fn company<D: Driver + ?Sized>(driver: &mut D, scopes: &[Scope], page_title: &str) -> String {
    if let Some(company) = company_from_title(page_title) {
        return company;
    }
    let selectors = [
        SelectorList::from(Selector::any().class("company-name")),
        SelectorList::from(Selector::any().attr_eq("data-testid", "company-name")),
    ];
    for selector in &selectors {
        if let Some(company) = first_text(driver, scopes, selector) {
            return company;
        }
    }
    let logo = SelectorList::from(Selector::tag("img").attr_contains("alt", "Logo"));
    for &scope in scopes {
        for node in driver.query_all(scope, &logo).unwrap_or_default() {
            let alt = driver.attr_or_empty(node, "alt");
            let company = alt.replace("Logo", "").replace("logo", "");
            let company = company.trim();
            if !company.is_empty() {
                return company.to_string();
            }
        }
    }
    UNKNOWN_COMPANY.to_string()
}

/// `Job Application for Backend Engineer at Acme` → `Backend Engineer`
pub fn title_from_application_heading(page_title: &str) -> Option<String> {
    let (_, rest) = page_title.split_once(APPLICATION_PREFIX)?;
    let title = rest.split(" at ").next().unwrap_or_default().trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Company after the last " at " of the page title.
pub fn company_from_title(page_title: &str) -> Option<String> {
    let (_, company) = page_title.rsplit_once(" at ")?;
    let company = company.trim();
    (!company.is_empty()).then(|| company.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_heading_is_split() {
        let title = "Job Application for Backend Engineer at Acme Corp";
        assert_eq!(title_from_application_heading(title), Some("Backend Engineer".into()));
        assert_eq!(company_from_title(title), Some("Acme Corp".into()));
    }

    #[test]
    fn plain_titles_yield_nothing() {
        assert_eq!(title_from_application_heading("Careers"), None);
        assert_eq!(company_from_title("Careers"), None);
    }
}
