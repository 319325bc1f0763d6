#![allow(dead_code)]

pub mod pages;

use job_form_automator::browser::snapshot::SnapshotNode;
use job_form_automator::cli::config::AppConfig;

pub const LEFT: f64 = 20.0;
pub const WIDTH: f64 = 400.0;

/// Defaults with every pause at zero; the snapshot driver ignores waits
/// anyway.
pub fn config() -> AppConfig {
    AppConfig::default()
}

pub fn el(tag: &str) -> SnapshotNode {
    SnapshotNode::new(tag)
}

/// `<label for=id>` sitting directly above a control placed at `y`.
pub fn label_for(id: &str, text: &str, y: f64) -> SnapshotNode {
    el("label").attr("for", id).text(text).rect(LEFT, y - 25.0, 200.0, 20.0)
}

pub fn input(id: &str, input_type: &str, y: f64) -> SnapshotNode {
    el("input")
        .id(id)
        .attr("name", id)
        .attr("type", input_type)
        .rect(LEFT, y, WIDTH, 30.0)
}

/// Labelled input wrapped in its own row.
pub fn labelled_input(id: &str, input_type: &str, label: &str, y: f64) -> SnapshotNode {
    el("div")
        .attr("class", "field")
        .rect(LEFT, y - 25.0, WIDTH, 60.0)
        .children([label_for(id, label, y), input(id, input_type, y)])
}

/// Native select with one option per text; an empty text is a placeholder.
pub fn native_select(id: &str, label: &str, options: &[&str], y: f64) -> SnapshotNode {
    let select = el("select")
        .id(id)
        .attr("name", id)
        .rect(LEFT, y, WIDTH, 30.0)
        .children(options.iter().map(|text| {
            let option = el("option").text(text);
            if text.is_empty() {
                option.attr("value", "")
            } else {
                option.attr("value", &text.to_lowercase())
            }
        }));
    el("div")
        .attr("class", "field")
        .rect(LEFT, y - 25.0, WIDTH, 60.0)
        .children([label_for(id, label, y), select])
}

/// A fieldset of checkboxes sharing `name`, each wrapped in its label, with
/// the question as legend.
pub fn checkbox_fieldset(name: &str, question: &str, choices: &[&str], y: f64) -> SnapshotNode {
    let rows = choices.iter().enumerate().map(|(i, text)| {
        let row_y = y + 30.0 + 25.0 * i as f64;
        el("label").text(text).rect(LEFT, row_y, 250.0, 20.0).child(
            el("input")
                .attr("type", "checkbox")
                .attr("name", &format!("{}[]", name))
                .attr("value", &text.to_lowercase())
                .rect(LEFT, row_y, 16.0, 16.0),
        )
    });
    el("fieldset")
        .rect(LEFT, y, WIDTH, 40.0 + 25.0 * choices.len() as f64)
        .children([
            el("legend").text(question).rect(LEFT, y, WIDTH, 20.0),
            el("div").attr("class", "choices").children(rows),
        ])
}

/// Custom combobox that reveals a listbox of `role=option` items.
pub fn custom_combobox(id: &str, label: &str, options: &[&str], y: f64) -> SnapshotNode {
    let list_id = format!("{}-list", id);
    let items = options.iter().enumerate().map(|(i, text)| {
        el("li")
            .attr("role", "option")
            .text(text)
            .rect(LEFT, y + 35.0 + 25.0 * i as f64, WIDTH, 20.0)
    });
    el("div")
        .attr("class", "field")
        .rect(LEFT, y - 25.0, WIDTH, 60.0)
        .children([
            el("label").attr("id", &format!("{}-label", id)).text(label).rect(LEFT, y - 25.0, 200.0, 20.0),
            el("div")
                .id(id)
                .attr("role", "combobox")
                .attr("aria-labelledby", &format!("{}-label", id))
                .attr("aria-controls", &list_id)
                .attr("aria-expanded", "false")
                .rect(LEFT, y, WIDTH, 30.0),
            el("ul")
                .id(&list_id)
                .attr("role", "listbox")
                .rect(LEFT, y + 35.0, WIDTH, 25.0 * options.len() as f64)
                .hidden()
                .children(items),
        ])
}

pub fn submit_button(y: f64) -> SnapshotNode {
    el("button").attr("type", "submit").text("Submit Application").rect(LEFT, y, 200.0, 40.0)
}

pub fn body(children: impl IntoIterator<Item = SnapshotNode>) -> SnapshotNode {
    el("body").rect(0.0, 0.0, 1200.0, 3000.0).children(children)
}
