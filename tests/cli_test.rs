use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn options_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{json}").unwrap();
    file
}

#[test]
fn test_simulated_session_end_to_end() {
    let file = options_file(
        r#"{
            "publicKey": "pk_test_123",
            "reference": "ORDER-7",
            "amount": 2500,
            "currency": "NGN",
            "email": "ada@example.com",
            "redirectUrl": "https://merchant.test/return"
        }"#,
    );

    let mut cmd = Command::new(cargo_bin!("novac-checkout"));
    cmd.arg(file.path())
        .args(["--simulate", "pending,drop,successful"])
        .args(["--no-wait", "--poll-interval-ms", "10"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("reference: ORDER-7"))
        .stdout(predicate::str::contains(
            "payment page: https://checkout.novac.test/pay/ORDER-7",
        ))
        .stdout(predicate::str::contains("on_success:"))
        .stdout(predicate::str::contains(
            "redirect: https://merchant.test/return?transactionReference=ORDER-7&status=success",
        ))
        .stdout(predicate::str::contains("outcome: success"));
}

#[test]
fn test_simulated_failure_redirects_with_failed_status() {
    let file = options_file(
        r#"{
            "publicKey": "pk_test_123",
            "reference": "ORDER-8",
            "amount": 10,
            "currency": "usd",
            "email": "grace@example.com",
            "redirectUrl": "http://merchant.test/return"
        }"#,
    );

    let mut cmd = Command::new(cargo_bin!("novac-checkout"));
    cmd.arg(file.path())
        .args(["--simulate", "FAILED", "--assume-reachable"])
        .args(["--no-wait", "--poll-interval-ms", "10"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("on_error: Payment failed for transaction ORDER-8"))
        .stdout(predicate::str::contains(
            "redirect: https://merchant.test/return?transactionReference=ORDER-8&status=failed",
        ))
        .stdout(predicate::str::contains("outcome: failed"));
}

#[test]
fn test_missing_required_field_fails_fast() {
    let file = options_file(r#"{ "publicKey": "pk_test_123", "currency": "NGN", "email": "a@b.test" }"#);

    let mut cmd = Command::new(cargo_bin!("novac-checkout"));
    cmd.arg(file.path()).args(["--simulate", "successful", "--no-wait"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("amount is required"))
        .stdout(predicate::str::contains("payment page").not());
}

#[test]
fn test_unsupported_redirect_scheme_is_reported() {
    let file = options_file(
        r#"{
            "publicKey": "pk_test_123",
            "amount": 5,
            "currency": "NGN",
            "email": "ada@example.com",
            "redirectUrl": "ftp://merchant.test/return"
        }"#,
    );

    let mut cmd = Command::new(cargo_bin!("novac-checkout"));
    cmd.arg(file.path())
        .args(["--simulate", "successful", "--no-wait"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("outcome: success (redirect aborted"))
        .stdout(predicate::str::contains("redirect: ").not());
}
