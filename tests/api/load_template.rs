use serde_json::Value;
use uuid::Uuid;

use crate::helpers::spawn_app;

#[tokio::test]
async fn loading_a_stored_template_returns_subject_and_content() {
    // Arrange
    let app = spawn_app().await;
    let template_id = app
        .seed_template(
            "Welcome",
            "Welcome aboard!",
            "<p>Glad to have you.</p>",
            true,
        )
        .await;

    // Act
    let response = app.get_load_template(&template_id.to_string()).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["subject"], "Welcome aboard!");
    assert_eq!(body["content"], "<p>Glad to have you.</p>");
}

#[tokio::test]
async fn loading_an_unknown_template_fails() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get_load_template(&Uuid::new_v4().to_string()).await;

    // Assert
    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], Value::Bool(false));
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn inactive_templates_are_not_served() {
    // Arrange
    let app = spawn_app().await;
    let template_id = app
        .seed_template("Retired", "Old subject", "Old content", false)
        .await;

    // Act
    let response = app.get_load_template(&template_id.to_string()).await;

    // Assert
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn the_preview_client_loads_templates_end_to_end() {
    // Arrange
    let app = spawn_app().await;
    let template_id = app
        .seed_template("Welcome", "Welcome aboard!", "<p>Hello!</p>", true)
        .await;
    let client = app.preview_client();

    // Act
    let template = client
        .load_template(template_id)
        .await
        .expect("Loading the template failed.");

    // Assert
    assert_eq!(template.subject, "Welcome aboard!");
    assert_eq!(template.content, "<p>Hello!</p>");
}
