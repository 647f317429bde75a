mod common;

use common::{credentials, page, redirected, FixedProvider, ScriptedTransport, LOGIN_PAGE};
use daily_checkin::{
    jobs,
    orchestrator::{RunContext, Settings},
    runner::Runner,
};

const SIGNED: &str = r#"{"success": true, "resultCode": "0000", "resultMessage": "ok"}"#;

#[test]
fn faulting_job_does_not_affect_the_next() {
    let web = jobs::web();
    let app = jobs::app();

    let transport = ScriptedTransport::new();
    // Nothing scripted for the web job: its first request errors out.
    transport.on(&app.status_url, page(&app.status_url, "{}"));
    transport.on(
        &app.index_url,
        page(&app.index_url, "dakaed: false, dakaNumber: 4"),
    );
    transport.on(&app.sign_url, page(&app.sign_url, SIGNED));

    let provider = FixedProvider::accepting("1");
    let creds = credentials();
    let settings = Settings::default();
    let runner = Runner::new(RunContext {
        session: &transport,
        provider: &provider,
        credentials: &creds,
        settings: &settings,
    });

    let summary = runner.run_all(&[web.clone(), app.clone()]);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_labels, vec![web.label.clone()]);
    assert!(summary.results[1].success);
    assert_eq!(transport.calls_to(&app.sign_url), 1);
}

#[test]
fn login_failure_then_already_signed() {
    let web = jobs::web();
    let app = jobs::app();

    let transport = ScriptedTransport::new();
    transport.on(&web.status_url, redirected(LOGIN_PAGE, "<form/>"));
    transport.on(
        &web.login_url,
        redirected(
            "https://graph.qq.com/oauth/show?which=Login&redirect_uri=https%3A%2F%2Fplogin.m.jd.com%2Fcb&state=x",
            "<html/>",
        ),
    );
    transport.on(&app.status_url, page(&app.status_url, "{}"));
    transport.on(
        &app.index_url,
        page(&app.index_url, "dakaed: true, dakaNumber: 30"),
    );

    let provider = FixedProvider::accepting("1");
    let creds = credentials();
    let settings = Settings::default();
    let runner = Runner::new(RunContext {
        session: &transport,
        provider: &provider,
        credentials: &creds,
        settings: &settings,
    });

    let summary = runner.run_all(&[web.clone(), app.clone()]);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_labels, vec![web.label.clone()]);
    assert!(summary.results[0]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("client_id")));
    assert!(summary.results[1].success);
    assert_eq!(transport.calls_to(&app.sign_url), 0);
    assert_eq!(transport.calls_to(&settings.authorize_url), 0);
    assert!(summary.render_text().contains("failed: 1"));
}

#[test]
fn bad_status_pattern_fails_only_that_job() {
    let mut broken = jobs::web();
    broken.label = "broken".into();
    broken.extractor.signed_pattern = "dakaed:(".into();
    let app = jobs::app();

    let transport = ScriptedTransport::new();
    transport.on(&app.status_url, page(&app.status_url, "{}"));
    transport.on(
        &app.index_url,
        page(&app.index_url, "dakaed: true, dakaNumber: 1"),
    );

    let provider = FixedProvider::accepting("1");
    let creds = credentials();
    let settings = Settings::default();
    let runner = Runner::new(RunContext {
        session: &transport,
        provider: &provider,
        credentials: &creds,
        settings: &settings,
    });

    let summary = runner.run_all(&[broken, app]);
    assert_eq!(summary.failed_labels, vec!["broken".to_string()]);
    assert!(summary.results[1].success);
}

#[test]
fn status_probe_reports_without_signing() {
    let app = jobs::app();
    let transport = ScriptedTransport::new();
    transport.on(&app.status_url, page(&app.status_url, "{}"));
    transport.on(
        &app.index_url,
        page(&app.index_url, "dakaed: false, dakaNumber: 9"),
    );

    let provider = FixedProvider::accepting("1");
    let creds = credentials();
    let settings = Settings::default();
    let runner = Runner::new(RunContext {
        session: &transport,
        provider: &provider,
        credentials: &creds,
        settings: &settings,
    });

    let probes = runner.probe_all(std::slice::from_ref(&app));
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].logged_in, Some(true));
    assert_eq!(probes[0].signed_today, Some(false));
    assert_eq!(probes[0].consecutive_days, Some(9));
    assert_eq!(transport.calls_to(&app.sign_url), 0);
}
