use job_form_automator::browser::snapshot::{SnapshotDocument, SnapshotNode};

use super::{
    LEFT, WIDTH, body, checkbox_fieldset, custom_combobox, el, input, label_for, labelled_input,
    native_select, submit_button,
};

pub const POSTING_URL: &str = "https://jobs.acme.com/senior-engineer";
pub const POSTING_TITLE: &str = "Job Application for Senior Engineer at Acme";
pub const GREENHOUSE_SRC: &str = "https://boards.greenhouse.io/embed/job_app?for=acme";
pub const CAREERS_SRC: &str = "https://careers.acme.com/apply/embed";
pub const HOST_URL: &str = "https://www.acme.com/careers/senior-engineer";

pub const GENDER_CHOICES: &[&str] = &["Woman", "Man", "Non-binary", "Transgender", "I don't wish to answer"];
pub const LOCATIONS: &[&str] = &["London", "Berlin", "Remote"];

/// Upload group with an Attach button and a hidden file input.
pub fn resume_group(y: f64) -> SnapshotNode {
    el("div")
        .attr("role", "group")
        .attr("aria-label", "Resume/CV")
        .rect(LEFT, y, WIDTH, 90.0)
        .children([
            el("label").text("Resume/CV *").rect(LEFT, y, 200.0, 20.0),
            el("button").attr("type", "button").text("Attach").rect(LEFT, y + 25.0, 80.0, 30.0),
            el("input")
                .id("resume")
                .attr("name", "resume")
                .attr("type", "file")
                .attr("accept", ".pdf,.docx")
                .rect(LEFT, y + 25.0, 80.0, 30.0)
                .hidden(),
            el("p").text("Accepted file types: pdf, docx").rect(LEFT, y + 60.0, WIDTH, 20.0),
        ])
}

pub fn why_textarea(y: f64) -> SnapshotNode {
    el("div").attr("class", "field").rect(LEFT, y - 25.0, WIDTH, 130.0).children([
        label_for("why_acme", "Why do you want to work at Acme?", y),
        el("textarea")
            .id("why_acme")
            .attr("name", "why_acme")
            .rect(LEFT, y, WIDTH, 100.0),
    ])
}

/// The full application form: text, email, native select, custom
/// combobox, textarea, upload group, demographics checkboxes.
pub fn application_form() -> SnapshotNode {
    el("form").id("application").rect(0.0, 100.0, 800.0, 1400.0).children([
        labelled_input("first_name", "text", "First Name *", 150.0),
        labelled_input("email", "email", "Email", 250.0),
        native_select("country", "Country", &["", "USA", "Canada"], 350.0),
        custom_combobox("location", "Location", LOCATIONS, 450.0),
        why_textarea(600.0),
        resume_group(780.0),
        checkbox_fieldset("gender", "What is your gender identity?", GENDER_CHOICES, 950.0),
        el("p")
            .text("By submitting this application you agree that Acme may process your personal data for recruiting purposes.")
            .rect(LEFT, 1200.0, 700.0, 40.0),
        submit_button(1300.0),
    ])
}

pub fn application_page() -> SnapshotDocument {
    SnapshotDocument::new(
        POSTING_URL,
        POSTING_TITLE,
        body([
            el("h1").text("Senior Engineer").rect(LEFT, 20.0, 600.0, 40.0),
            application_form(),
        ]),
    )
}

/// Form document served inside an ATS iframe.
pub fn embedded_form_document(src: &str) -> SnapshotDocument {
    SnapshotDocument::new(src, "Acme application", body([application_form()]))
}

/// A short form with exactly three controls.
pub fn small_form_document(src: &str) -> SnapshotDocument {
    SnapshotDocument::new(
        src,
        "Apply",
        body([
            labelled_input("full_name", "text", "Full Name", 100.0),
            labelled_input("contact_email", "email", "Email", 200.0),
            labelled_input("portfolio", "url", "Portfolio", 300.0),
        ]),
    )
}

pub fn iframe(src: &str, document: SnapshotDocument, y: f64) -> SnapshotNode {
    el("iframe").attr("src", src).rect(LEFT, y, 800.0, 600.0).frame(document)
}

/// Careers page embedding a small careers-site form and the full
/// Greenhouse form, in that order.
pub fn two_iframe_page() -> SnapshotDocument {
    SnapshotDocument::new(
        HOST_URL,
        "Senior Engineer | Acme Careers",
        body([
            el("h1").text("Senior Engineer").rect(LEFT, 20.0, 600.0, 40.0),
            iframe(CAREERS_SRC, small_form_document(CAREERS_SRC), 100.0),
            iframe(GREENHOUSE_SRC, embedded_form_document(GREENHOUSE_SRC), 800.0),
        ]),
    )
}

pub fn single_iframe_page(src: &str, document: SnapshotDocument) -> SnapshotDocument {
    SnapshotDocument::new(
        HOST_URL,
        "Senior Engineer | Acme Careers",
        body([
            el("h1").text("Senior Engineer").rect(LEFT, 20.0, 600.0, 40.0),
            iframe(src, document, 100.0),
        ]),
    )
}

/// Host page after the embed was removed.
pub fn host_without_iframe() -> SnapshotDocument {
    SnapshotDocument::new(
        HOST_URL,
        "Senior Engineer | Acme Careers",
        body([el("h1").text("Senior Engineer").rect(LEFT, 20.0, 600.0, 40.0)]),
    )
}

pub fn empty_page(url: &str) -> SnapshotDocument {
    SnapshotDocument::new(
        url,
        "Careers",
        body([el("p").text("No open positions right now.").rect(LEFT, 20.0, 600.0, 20.0)]),
    )
}

/// Search box in the header, the application form further down.
pub fn page_with_search_box() -> SnapshotDocument {
    SnapshotDocument::new(
        POSTING_URL,
        POSTING_TITLE,
        body([
            el("header").rect(0.0, 0.0, 1200.0, 60.0).child(input("site_search", "search", 10.0)),
            application_form(),
        ]),
    )
}

pub fn page_with_cookie_banner() -> SnapshotDocument {
    SnapshotDocument::new(
        POSTING_URL,
        POSTING_TITLE,
        body([
            el("div").id("cookie-banner").rect(0.0, 2800.0, 1200.0, 120.0).children([
                el("p").text("We use cookies to improve your experience.").rect(LEFT, 2810.0, 600.0, 20.0),
                el("button").id("reject-cookies").text("Reject").rect(LEFT, 2850.0, 100.0, 30.0),
                el("button").id("accept-cookies").text("Accept All").rect(140.0, 2850.0, 100.0, 30.0),
            ]),
            el("h1").text("Senior Engineer").rect(LEFT, 20.0, 600.0, 40.0),
            application_form(),
        ]),
    )
}

/// Page shown after the user submitted.
pub fn thank_you_page(url: &str) -> SnapshotDocument {
    SnapshotDocument::new(
        url,
        "Application received",
        body([el("h2").text("Thank you for applying!").rect(LEFT, 20.0, 600.0, 30.0)]),
    )
}

/// Form with a "Locate me" control beside the city field.
pub fn page_with_locate_button() -> SnapshotDocument {
    SnapshotDocument::new(
        POSTING_URL,
        POSTING_TITLE,
        body([el("form").rect(0.0, 100.0, 800.0, 400.0).children([
            labelled_input("first_name", "text", "First Name *", 150.0),
            labelled_input("candidate_city", "text", "City", 250.0),
            el("button")
                .attr("type", "button")
                .attr("class", "locate-me")
                .text("Locate me")
                .rect(440.0, 250.0, 120.0, 30.0),
            submit_button(350.0),
        ])]),
    )
}
