mod helpers;

use helpers::{Project, TestServer};
use modmock::{
    ControllerState, FileChange, HostMode, LoadOutcome, MockError, TransformOutcome,
};

const API_SOURCE: &str = "export function getUser(id) {\n  return fetch(`/users/${id}`);\n}\n";

#[tokio::test]
async fn manual_mock_is_served_byte_for_byte() {
    let project = Project::new();
    let api = project.write("src/api.ts", API_SOURCE);
    let mock_source = "// manual mock\r\nexport const getUser = () => ({ id: \"1\" });\n\n";
    let redirect = project.write("src/__mocks__/api.ts", mock_source);
    project.write_config("sb.mock('../src/api.ts', { spy: true });\n");

    let session = project.session(HostMode::Build);
    session.build_start().await.unwrap();

    let outcome = session.load(&project.id("src/api.ts")).await;
    assert_eq!(
        outcome,
        LoadOutcome::Redirected {
            path: redirect,
            code: mock_source.to_string()
        }
    );

    // A redirected module is never automocked, even with spy set
    let transformed = session.transform(API_SOURCE, &api.to_string_lossy()).await;
    assert_eq!(transformed.code(), Some(mock_source));
}

#[tokio::test]
async fn spy_registration_automocks_with_recording() {
    let project = Project::new();
    project.write("src/api.ts", API_SOURCE);
    project.write_config("sb.mock('../src/api.ts', { spy: true });\n");

    let session = project.session(HostMode::Build);
    session.build_start().await.unwrap();

    match session.transform(API_SOURCE, &project.id("src/api.ts")).await {
        TransformOutcome::Automocked { code, map } => {
            assert!(code.contains("__modmock_mock_module__({ \"getUser\": getUser }, true)"));
            assert!(code.contains("as getUser };"));
            assert!(map.to_json_string().contains("api.ts"));
        }
        other => panic!("expected automock, got {:?}", other),
    }
}

#[tokio::test]
async fn package_mock_matches_optimized_dep_only_in_serve_mode() {
    let project = Project::new();
    project.add_package("lodash", "export function map() {}\nexport function filter() {}\n");
    project.write_config("sb.mock('lodash');\n");

    let optimized_id = project.id("node_modules/.vite/deps/lodash.js?v=9f8e7d6c");
    let unrelated_id = project.id("src/other.ts");
    let source = "export function map() {}\nexport function filter() {}\n";

    let serve = project.session(HostMode::Serve);
    serve.build_start().await.unwrap();
    assert!(matches!(
        serve.transform(source, &optimized_id).await,
        TransformOutcome::Automocked { .. }
    ));
    assert!(serve.transform("export const x = 1;", &unrelated_id).await.is_pass_through());

    let build = project.session(HostMode::Build);
    build.build_start().await.unwrap();
    assert!(build.transform(source, &optimized_id).await.is_pass_through());
    assert!(matches!(
        build
            .transform(source, &project.id("node_modules/lodash/index.js"))
            .await,
        TransformOutcome::Automocked { .. }
    ));
}

#[tokio::test]
async fn removing_a_mock_invalidates_and_restores_original() {
    let project = Project::new();
    project.write("src/a.ts", "export function a() {}\n");
    project.write("src/b.ts", "export function b() {}\n");
    project.write("src/c.ts", "export function c() {}\n");
    let config = project.write_config("sb.mock('../src/a.ts');\nsb.mock('../src/b.ts');\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();

    let server = TestServer::default();
    for rel in ["src/a.ts", "src/b.ts", "src/c.ts", ".storybook/preview.ts"] {
        server.graph.add_module(project.id(rel));
    }
    let (_, mut client) = server.hot.register_client();

    assert!(matches!(
        session.transform("export function a() {}\n", &project.id("src/a.ts")).await,
        TransformOutcome::Automocked { .. }
    ));

    project.write_config("sb.mock('../src/b.ts');\n");
    let report = session
        .handle_file_change(&FileChange::Modified(config), &server)
        .await
        .unwrap()
        .expect("config change triggers invalidation");

    assert_eq!(report.removed, vec![project.path("src/a.ts")]);
    assert!(server.graph.is_invalidated(&project.id("src/a.ts")));
    assert!(server.graph.is_invalidated(&project.id("src/b.ts")));
    assert!(server.graph.is_invalidated(&project.id(".storybook/preview.ts")));
    assert!(!server.graph.is_invalidated(&project.id("src/c.ts")));

    assert_eq!(client.recv().await.unwrap(), r#"{"type":"full-reload"}"#);

    assert_eq!(session.manifest().len(), 1);
    assert!(session
        .transform("export function a() {}\n", &project.id("src/a.ts"))
        .await
        .is_pass_through());
    assert_eq!(session.load(&project.id("src/a.ts")).await, LoadOutcome::PassThrough);
    assert_eq!(session.state(), ControllerState::Idle);
}

#[tokio::test]
async fn config_change_invalidates_optimized_variants() {
    let project = Project::new();
    project.add_package("lodash", "export function map() {}\n");
    let config = project.write_config("sb.mock('lodash', { spy: true });\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();

    let server = TestServer::default();
    let optimized_id = project.id("node_modules/.vite/deps/lodash.js?v=1234abcd");
    server.graph.add_module(optimized_id.clone());
    server.graph.add_import(project.id("src/Button.tsx"), optimized_id.clone());

    session
        .handle_file_change(&FileChange::Modified(config), &server)
        .await
        .unwrap();

    assert!(server.graph.is_invalidated(&optimized_id));
    assert!(server.graph.is_invalidated(&project.id("src/Button.tsx")));
}

#[tokio::test]
async fn adding_a_manual_mock_switches_to_redirect() {
    let project = Project::new();
    project.write("src/api.ts", API_SOURCE);
    project.write_config("sb.mock('../src/api.ts');\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();
    assert_eq!(session.load(&project.id("src/api.ts")).await, LoadOutcome::PassThrough);

    let server = TestServer::default();
    let redirect = project.write("src/__mocks__/api.ts", "export const getUser = () => null;\n");
    let report = session
        .handle_file_change(&FileChange::Created(redirect.clone()), &server)
        .await
        .unwrap();
    assert!(report.is_some());

    assert!(matches!(
        session.load(&project.id("src/api.ts")).await,
        LoadOutcome::Redirected { path, .. } if path == redirect
    ));
}

#[tokio::test]
async fn unrelated_changes_are_ignored() {
    let project = Project::new();
    let api = project.write("src/api.ts", API_SOURCE);
    project.write_config("sb.mock('../src/api.ts');\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();

    let server = TestServer::default();
    let (_, mut client) = server.hot.register_client();
    let report = session
        .handle_file_change(&FileChange::Modified(api), &server)
        .await
        .unwrap();

    assert!(report.is_none());
    assert!(client.try_recv().is_err());
}

#[tokio::test]
async fn failed_re_extraction_keeps_manifest_and_skips_reload() {
    let project = Project::new();
    project.write("src/api.ts", API_SOURCE);
    let config = project.write_config("sb.mock('../src/api.ts');\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();
    let before = session.manifest();

    std::fs::remove_file(&config).unwrap();

    let server = TestServer::default();
    server.graph.add_module(project.id("src/api.ts"));
    let (_, mut client) = server.hot.register_client();

    let err = session
        .handle_file_change(&FileChange::Removed(config), &server)
        .await
        .unwrap_err();
    assert!(matches!(err, MockError::WatchCallback { .. }));

    assert_eq!(*session.manifest(), *before);
    assert!(server.graph.invalidated_ids().is_empty());
    assert!(client.try_recv().is_err());
}

#[tokio::test]
async fn watch_loop_processes_events_until_closed() {
    let project = Project::new();
    project.write("src/api.ts", API_SOURCE);
    let config = project.write_config("sb.mock('../src/api.ts');\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();

    let server = TestServer::default();
    let (_, mut client) = server.hot.register_client();
    let (tx, rx) = tokio::sync::mpsc::channel(4);

    project.write_config("");
    tx.send(FileChange::Modified(config)).await.unwrap();
    drop(tx);

    session.run_watch_loop(rx, &server).await;

    assert!(session.manifest().is_empty());
    assert_eq!(client.recv().await.unwrap(), r#"{"type":"full-reload"}"#);
}

#[tokio::test]
async fn concurrent_config_changes_settle_on_full_extraction() {
    let project = Project::new();
    project.write("src/a.ts", "export function a() {}\n");
    project.write("src/b.ts", "export function b() {}\n");
    let config = project.write_config("sb.mock('../src/a.ts');\n");

    let session = project.session(HostMode::Serve);
    session.build_start().await.unwrap();

    project.write_config("sb.mock('../src/b.ts');\n");
    project.write_config("sb.mock('../src/a.ts');\nsb.mock('../src/b.ts', { spy: true });\n");

    let server = TestServer::default();
    server.graph.add_module(project.id("src/a.ts"));
    server.graph.add_module(project.id("src/b.ts"));
    let (_, mut client) = server.hot.register_client();

    let change = FileChange::Modified(config);
    let (first, second) = tokio::join!(
        session.handle_file_change(&change, &server),
        session.handle_file_change(&change, &server),
    );
    assert!(first.unwrap().is_some());
    assert!(second.unwrap().is_some());

    let expected = modmock::extract(&project.options(), project.root())
        .await
        .unwrap()
        .manifest;
    assert_eq!(*session.manifest(), expected);
    assert_eq!(session.manifest().len(), 2);
    assert_eq!(session.state(), ControllerState::Idle);

    assert_eq!(client.recv().await.unwrap(), r#"{"type":"full-reload"}"#);
    assert_eq!(client.recv().await.unwrap(), r#"{"type":"full-reload"}"#);
    assert!(server.graph.is_invalidated(&project.id("src/b.ts")));
}
