use super::*;

const LOGIN_PAGE: &str = r#"
<html>
  <body>
    <nav>
      <a href="/home" id="home-link" class="nav">Home</a>
      <a>No href, not a link</a>
    </nav>
    <form id="login" action="/session" method="post">
      <label for="user">Username</label>
      <input id="user" name="username" type="text" placeholder="you@example.com">
      <label>Password <input name="password" type="password"></label>
      <input type="hidden" name="csrf" value="abc">
      <select id="region"><option>EU</option></select>
      <button id="submit" type="submit">
        Sign
        in
      </button>
    </form>
    <div role="button" class="fake-btn">Help</div>
  </body>
</html>
"#;

#[test]
fn test_extract_document_order() {
    let elements = extract_elements(LOGIN_PAGE);
    let kinds: Vec<ElementKind> = elements.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Link,
            ElementKind::Form,
            ElementKind::Input,
            ElementKind::Input,
            ElementKind::Button,
            ElementKind::Button,
        ]
    );
}

#[test]
fn test_extract_link_attributes() {
    let elements = extract_elements(LOGIN_PAGE);
    let link = &elements[0];
    assert_eq!(link.attribute("href"), Some("/home"));
    assert_eq!(link.id(), Some("home-link"));
    assert_eq!(link.attribute("class"), Some("nav"));
    assert_eq!(link.text.as_deref(), Some("Home"));
}

#[test]
fn test_extract_input_labels_and_default_type() {
    let elements = extract_elements(LOGIN_PAGE);
    let user = &elements[2];
    assert_eq!(user.attribute("label"), Some("Username"));
    assert_eq!(user.attribute("placeholder"), Some("you@example.com"));
    assert_eq!(user.attribute("type"), Some("text"));

    let password = &elements[3];
    assert_eq!(password.attribute("type"), Some("password"));
    assert_eq!(password.attribute("name"), Some("password"));
    assert!(password.attribute("label").unwrap().starts_with("Password"));
}

#[test]
fn test_extract_input_without_type_defaults_to_text() {
    let elements = extract_elements(r#"<input name="q">"#);
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].attribute("type"), Some("text"));
}

#[test]
fn test_extract_skips_hidden_inputs() {
    let elements = extract_elements(LOGIN_PAGE);
    assert!(elements.iter().all(|e| e.attribute("name") != Some("csrf")));
}

#[test]
fn test_extract_form_fields() {
    let elements = extract_elements(LOGIN_PAGE);
    let form = &elements[1];
    assert_eq!(form.id(), Some("login"));
    assert_eq!(form.attribute("method"), Some("post"));
    assert_eq!(form.fields, vec!["user", "password", "region", "submit"]);
}

#[test]
fn test_extract_button_text_collapsed() {
    let elements = extract_elements(LOGIN_PAGE);
    let submit = &elements[4];
    assert_eq!(submit.id(), Some("submit"));
    assert_eq!(submit.text.as_deref(), Some("Sign in"));
}

#[test]
fn test_extract_role_button() {
    let elements = extract_elements(LOGIN_PAGE);
    let help = &elements[5];
    assert_eq!(help.kind, ElementKind::Button);
    assert_eq!(help.attribute("role"), Some("button"));
    assert_eq!(help.attribute("tag"), Some("div"));
    assert_eq!(help.text.as_deref(), Some("Help"));
}

#[test]
fn test_extract_missing_categories_is_empty() {
    let elements = extract_elements("<p>Only text here</p>");
    assert!(elements.is_empty());

    let summary = ElementSummary::of(&elements);
    assert_eq!(summary, ElementSummary::default());
    assert_eq!(summary.total(), 0);
}

#[test]
fn test_summary_counts() {
    let summary = ElementSummary::of(&extract_elements(LOGIN_PAGE));
    assert_eq!(summary.links, 1);
    assert_eq!(summary.forms, 1);
    assert_eq!(summary.inputs, 2);
    assert_eq!(summary.buttons, 2);
    assert_eq!(summary.total(), 6);
}

#[test]
fn test_extractor_no_elements_is_error() {
    let result = ElementExtractor::extract("https://example.com", "<html><body></body></html>");
    match result {
        Err(FetchError::NoElements { url }) => assert_eq!(url, "https://example.com"),
        other => panic!("expected NoElements, got {:?}", other),
    }
}

#[test]
fn test_extractor_returns_elements() {
    let elements = ElementExtractor::extract("https://example.com", LOGIN_PAGE).unwrap();
    assert_eq!(elements.len(), 6);
}

#[test]
fn test_extract_tolerates_broken_markup() {
    let elements = extract_elements("<div><button id=go>Go<div><a href='#x'>x");
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].id(), Some("go"));
}

#[test]
fn test_uppercase_hidden_type_excluded_everywhere() {
    let markup = r#"<form id="f">
        <input type="HIDDEN" name="csrf" value="abc">
        <input type=" Text " id="q">
    </form>"#;
    let elements = extract_elements(markup);

    let inputs: Vec<_> = elements
        .iter()
        .filter(|e| e.kind == ElementKind::Input)
        .collect();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].attribute("type"), Some("text"));

    let form = elements.iter().find(|e| e.kind == ElementKind::Form).unwrap();
    assert_eq!(form.fields, vec!["q".to_string()]);
}
