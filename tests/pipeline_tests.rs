/// Record pipeline tests against a mocked registry service
/// Covers row filtering, the dedup cooldown, the capital filter and the field merge
use rust_cnpj_enrichment::dedup_cache::DedupCache;
use rust_cnpj_enrichment::lookup_client::RegistryClient;
use rust_cnpj_enrichment::models::{
    InputRow, PipelineSummary, RowOutcome, SkipReason, MIN_INPUT_FIELDS, OUTPUT_HEADER,
};
use rust_cnpj_enrichment::output::OutputSink;
use rust_cnpj_enrichment::pipeline::RecordPipeline;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACME: &str = "11222333000181";
const SMALL: &str = "44555666000100";

/// Builds a full-width export row: the CNPJ split over the first three
/// columns, quoted the way registry exports quote them.
fn export_row(cnpj: &str, ddd: &str, phone: &str, email: &str) -> InputRow {
    let mut fields = vec!["\"\"".to_string(); MIN_INPUT_FIELDS];
    fields[0] = format!("\"{}\"", &cnpj[..8]);
    fields[1] = format!("\"{}\"", &cnpj[8..12]);
    fields[2] = format!("\"{}\"", &cnpj[12..]);
    fields[5] = "\"02\"".to_string();
    fields[21] = format!("\"{}\"", ddd);
    fields[22] = format!("\"{}\"", phone);
    fields[27] = format!("\"{}\"", email);
    InputRow::new(fields)
}

fn company_json(cnpj: &str, capital: f64) -> serde_json::Value {
    serde_json::json!({
        "cnpj": cnpj,
        "razao_social": format!("EMPRESA {}", cnpj),
        "nome_fantasia": "FANTASIA",
        "capital_social": capital,
        "logradouro": "AVENIDA PAULISTA",
        "municipio": "SAO PAULO",
        "uf": "SP",
        "cep": "01310100"
    })
}

async fn mount_company(server: &MockServer, cnpj: &str, capital: f64, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", cnpj)))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_json(cnpj, capital)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn pipeline(server: &MockServer) -> RecordPipeline {
    let client = RegistryClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let cache = DedupCache::new(Duration::from_secs(2 * 60 * 60), 10_000);
    RecordPipeline::new(client, cache, Duration::ZERO)
}

async fn run(pipeline: &RecordPipeline, rows: &[InputRow]) -> (PipelineSummary, Vec<Vec<String>>) {
    let sink = OutputSink::from_writer(Vec::new());
    sink.write_header().unwrap();
    let summary = pipeline.run(rows, &sink).await;

    let bytes = sink.into_inner().unwrap();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    assert_eq!(reader.headers().unwrap(), &csv::StringRecord::from(OUTPUT_HEADER.to_vec()));
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();

    (summary, rows)
}

#[tokio::test]
async fn test_qualifying_company_written_with_source_contact_fields() {
    let server = MockServer::start().await;
    mount_company(&server, ACME, 75000.0, 1).await;

    let rows = [export_row(ACME, "11", "33334444", "financeiro@acme.com.br")];
    let (summary, written) = run(&pipeline(&server), &rows).await;

    assert_eq!(summary.written, 1);
    assert_eq!(
        written,
        vec![vec![
            ACME.to_string(),
            format!("EMPRESA {}", ACME),
            "FANTASIA".to_string(),
            "75000.00".to_string(),
            "AVENIDA PAULISTA".to_string(),
            "SAO PAULO".to_string(),
            "SP".to_string(),
            "01310100".to_string(),
            "11".to_string(),
            "33334444".to_string(),
            "financeiro@acme.com.br".to_string(),
        ]]
    );
}

#[tokio::test]
async fn test_capital_at_threshold_not_written() {
    let server = MockServer::start().await;
    mount_company(&server, ACME, 50000.0, 1).await;
    mount_company(&server, SMALL, 50000.01, 1).await;

    let rows = [
        export_row(ACME, "11", "1", "a@a.com"),
        export_row(SMALL, "21", "2", "b@b.com"),
    ];
    let (summary, written) = run(&pipeline(&server), &rows).await;

    assert_eq!(summary.below_threshold, 1);
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][0], SMALL);
    assert_eq!(written[0][3], "50000.01");
}

#[tokio::test]
async fn test_short_rows_never_reach_the_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_json(ACME, 1e6)))
        .expect(0)
        .mount(&server)
        .await;

    let mut short: Vec<String> = vec![String::new(); MIN_INPUT_FIELDS - 1];
    short[0] = "11222333".to_string();
    short[1] = "0001".to_string();
    short[2] = "81".to_string();

    let rows = [InputRow::new(short), InputRow::new(vec![])];
    let (summary, written) = run(&pipeline(&server), &rows).await;

    assert_eq!(summary.too_few_fields, 2);
    assert_eq!(summary.lookups, 0);
    assert!(written.is_empty());
}

#[tokio::test]
async fn test_invalid_identifier_skipped_without_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_json(ACME, 1e6)))
        .expect(0)
        .mount(&server)
        .await;

    let mut fields = vec![String::new(); MIN_INPUT_FIELDS];
    fields[0] = "\"11\"".to_string();
    fields[1] = "\"222\"".to_string();
    fields[2] = "\"3344445555\"".to_string();

    let (summary, written) = run(&pipeline(&server), &[InputRow::new(fields)]).await;

    assert_eq!(summary.invalid_identifier, 1);
    assert!(written.is_empty());
}

#[tokio::test]
async fn test_lookup_failure_does_not_stop_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{}", SMALL)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_company(&server, ACME, 120000.0, 1).await;

    let rows = [
        export_row(SMALL, "21", "2", "b@b.com"),
        export_row(ACME, "11", "1", "a@a.com"),
    ];
    let pipeline = pipeline(&server);
    let (summary, written) = run(&pipeline, &rows).await;

    assert_eq!(summary.lookup_failed, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(written[0][0], ACME);
    // Failed lookups leave no cooldown behind
    assert!(!pipeline.cache().should_skip(SMALL).await);
}

#[tokio::test]
async fn test_repeated_identifier_looked_up_once() {
    let server = MockServer::start().await;
    mount_company(&server, ACME, 75000.0, 1).await;

    let rows = [
        export_row(ACME, "11", "1", "first@acme.com.br"),
        export_row(ACME, "11", "2", "second@acme.com.br"),
    ];
    let (summary, written) = run(&pipeline(&server), &rows).await;

    assert_eq!(summary.recently_processed, 1);
    assert_eq!(summary.lookups, 1);
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][10], "first@acme.com.br");
}

#[tokio::test]
async fn test_cooldown_shared_across_runs() {
    let server = MockServer::start().await;
    mount_company(&server, ACME, 75000.0, 1).await;

    let pipeline = pipeline(&server);
    let other_upload = pipeline.clone();
    let rows = [export_row(ACME, "11", "1", "a@a.com")];

    let (first, _) = run(&pipeline, &rows).await;
    let (second, written) = run(&other_upload, &rows).await;

    assert_eq!(first.written, 1);
    assert_eq!(second.recently_processed, 1);
    assert!(written.is_empty());
}

#[tokio::test]
async fn test_below_threshold_still_marks_cooldown() {
    let server = MockServer::start().await;
    mount_company(&server, SMALL, 1000.0, 1).await;

    let pipeline = pipeline(&server);
    let row = export_row(SMALL, "21", "2", "b@b.com");
    let sink = OutputSink::from_writer(Vec::new());

    assert_eq!(
        pipeline.process_row(&row, &sink).await,
        RowOutcome::Skipped(SkipReason::BelowThreshold)
    );
    assert_eq!(
        pipeline.process_row(&row, &sink).await,
        RowOutcome::Skipped(SkipReason::RecentlyProcessed)
    );
}

#[tokio::test]
async fn test_written_rows_keep_input_order() {
    let server = MockServer::start().await;
    let ids = ["00000000000191", "33000167000101", "60746948000112"];
    for id in ids {
        mount_company(&server, id, 1_000_000.0, 1).await;
    }

    let rows: Vec<InputRow> = ids
        .iter()
        .map(|id| export_row(id, "11", "1", "x@y.com"))
        .collect();
    let (summary, written) = run(&pipeline(&server), &rows).await;

    assert_eq!(summary.written, 3);
    let order: Vec<&str> = written.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(order, ids);
}

#[tokio::test(start_paused = true)]
async fn test_delay_applies_to_every_row() {
    // Rows rejected before any lookup; the client is never used
    let client = RegistryClient::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
    let cache = DedupCache::new(Duration::from_secs(60), 100);
    let pipeline = RecordPipeline::new(client, cache, Duration::from_secs(1));

    let rows = vec![InputRow::new(vec!["too".to_string(), "short".to_string()]); 3];
    let sink = OutputSink::from_writer(Vec::new());

    let started = tokio::time::Instant::now();
    let summary = pipeline.run(&rows, &sink).await;

    assert_eq!(summary.too_few_fields, 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
}
