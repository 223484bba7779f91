use std::process::Command;

use assert_fs::prelude::*;
use predicates::prelude::*;

const REQUIREMENT: &str = "\
# Login (LOGIN)

As a payroll admin
I want to sign in quickly
So that I can reach the dashboard

Acceptance Criteria:
Valid users land on the dashboard

BDD Steps:
Given Alex is on the login page
When Alex clicks \"Submit\" button
Then Alex verifies \"Dashboard\" is displayed
";

fn stepsmith(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_stepsmith"))
        .args(args)
        .output()
        .expect("binary runs")
}

fn setup(temp: &assert_fs::TempDir) -> (String, String, String) {
    let input = temp.child("jira-login.md");
    input.write_str(REQUIREMENT).unwrap();
    let registry = temp.child("steps-registry");
    registry.create_dir_all().unwrap();
    let output = temp.child("generated");
    (
        input.path().display().to_string(),
        registry.path().display().to_string(),
        output.path().display().to_string(),
    )
}

#[test]
fn generate_produces_a_consistent_triple() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (input, registry, output) = setup(&temp);

    let result = stepsmith(&[
        "generate", &input, "--output", &output, "--registry", &registry,
    ]);
    assert!(
        result.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    // The jira- prefix is stripped from the document name.
    let feature = temp.child("generated/features/login.feature");
    feature.assert(predicate::str::contains("@Generated @regression @LOGIN"));
    feature.assert(predicate::str::contains("Feature: Login (LOGIN)"));
    feature.assert(predicate::str::contains("As a payroll admin"));
    feature.assert(predicate::str::contains(
        "Given Alex is logged into the application",
    ));

    // Steps appear in document order.
    let feature_text = std::fs::read_to_string(feature.path()).unwrap();
    let given = feature_text.find("Given Alex is on the login page").unwrap();
    let when = feature_text.find("When Alex clicks \"Submit\" button").unwrap();
    let then = feature_text
        .find("Then Alex verifies \"Dashboard\" is displayed")
        .unwrap();
    assert!(given < when && when < then);

    let steps = temp.child("generated/steps/login-steps.js");
    steps.assert(predicate::str::contains(
        "const LoginPage = require('../pages/login-page');",
    ));
    steps.assert(predicate::str::contains("new LoginPage(this.page)"));
    steps.assert(predicate::str::contains(".clickSubmit();"));
    steps.assert(predicate::str::contains(".verifyDashboardIsVisible();"));

    let page = temp.child("generated/pages/login-page.js");
    page.assert(predicate::str::contains("class LoginPage extends BasePage"));
    page.assert(predicate::str::contains("module.exports = LoginPage;"));
    page.assert(predicate::str::contains("async clickSubmit()"));
    page.assert(predicate::str::contains("async verifySubmitIsVisible()"));
    page.assert(predicate::str::contains("async verifyDashboardIsVisible()"));

    // Every method the steps file calls exists on the page object.
    let steps_text = std::fs::read_to_string(steps.path()).unwrap();
    let page_text = std::fs::read_to_string(page.path()).unwrap();
    for line in steps_text.lines() {
        if let Some(rest) = line.split("new LoginPage(this.page).").nth(1) {
            let method = rest.split('(').next().unwrap();
            assert!(
                page_text.contains(&format!("async {}()", method)),
                "page object lacks {}",
                method
            );
        }
    }

    // An empty registry means nothing was reusable.
    let report = temp.child("generated/login-analysis.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.path()).unwrap()).unwrap();
    assert_eq!(json["reusability_score"], 0.0);
    assert_eq!(json["adaptive"], false);
    assert_eq!(json["steps"].as_array().unwrap().len(), 3);
}

#[test]
fn existing_artifacts_need_force_to_overwrite() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (input, registry, output) = setup(&temp);

    let first = stepsmith(&[
        "generate", &input, "--output", &output, "--registry", &registry,
    ]);
    assert!(first.status.success());

    let second = stepsmith(&[
        "generate", &input, "--output", &output, "--registry", &registry,
    ]);
    assert!(!second.status.success(), "overwrite without --force succeeded");

    let forced = stepsmith(&[
        "generate", &input, "--output", &output, "--registry", &registry, "--force",
    ]);
    assert!(forced.status.success());
}

#[test]
fn matching_registry_steps_are_reused_as_references() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (input, registry, output) = setup(&temp);

    temp.child("steps-registry/common-steps.js")
        .write_str(
            "When('Alex clicks \"Submit\" button', async function () {\n  await new CommonPage(this.page).clickSubmit();\n});\n",
        )
        .unwrap();

    let result = stepsmith(&[
        "generate", &input, "--output", &output, "--registry", &registry,
    ]);
    assert!(
        result.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let steps = temp.child("generated/steps/login-steps.js");
    steps.assert(predicate::str::contains("Covered by an existing definition"));
    steps.assert(predicate::str::contains("common-steps"));

    let report = temp.child("generated/login-analysis.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.path()).unwrap()).unwrap();
    assert!(json["adaptive"].as_bool().unwrap());
}

#[test]
fn validate_passes_on_a_well_formed_requirement() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (input, registry, _output) = setup(&temp);

    let result = stepsmith(&["validate", &input, "--registry", &registry]);
    assert!(
        result.status.success(),
        "validate failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
}

#[test]
fn scan_reports_registry_statistics_as_json() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (_input, registry, _output) = setup(&temp);

    temp.child("steps-registry/common-steps.js")
        .write_str(
            "Given('Alex is logged into the application', async function () {\n  await new CommonPage(this.page).performLogin();\n});\n",
        )
        .unwrap();

    let result = stepsmith(&["scan", "--registry", &registry]);
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(json["records"], 1);
    assert_eq!(json["background_steps"], 1);
}
