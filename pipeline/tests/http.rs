//! The REST adapter against a local server replaying scripted responses
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use pecluster::{Cell, Table, TargetType};
use pecluster_pipeline::config::PlatformConfig;
use pecluster_pipeline::platform::{
    DatasetId, ExplanationsId, ModelId, Platform, PlatformError, ProjectId,
};
use pecluster_pipeline::HttpPlatform;
use serde_json::Value;

#[derive(Debug, Clone)]
struct Reply {
    status: u16,
    location: Option<String>,
    body: String,
}

impl Reply {
    fn json(status: u16, body: &str) -> Reply {
        Reply {
            status,
            location: None,
            body: body.to_string(),
        }
    }

    fn redirect(status: u16, location: String) -> Reply {
        Reply {
            status,
            location: Some(location),
            body: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Request {
    /// Method and target, e.g. `GET /api/v2/projects/p/`
    line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Replies are queued per request line, the last reply of a queue repeats
struct Server {
    base: String,
    listener: TcpListener,
    routes: HashMap<String, Vec<Reply>>,
}

impl Server {
    fn new() -> Server {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        Server {
            base,
            listener,
            routes: HashMap::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base, path)
    }

    fn route(mut self, line: &str, replies: Vec<Reply>) -> Server {
        self.routes.insert(line.to_string(), replies);
        self
    }

    fn config(&self) -> PlatformConfig {
        PlatformConfig {
            endpoint: format!("{}/api/v2/", self.base),
            poll_interval_secs: 0.0,
            max_wait_secs: 5,
            explanation_max_wait_secs: 5,
            ..PlatformConfig::default()
        }
    }

    fn start(self) -> (HttpPlatform, Arc<Mutex<Vec<Request>>>) {
        let platform = HttpPlatform::new(&self.config(), "secret".to_string()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let Server {
            listener,
            mut routes,
            ..
        } = self;

        let requests = Arc::clone(&log);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                let request = read_request(&stream);
                let reply = match routes.get_mut(&request.line) {
                    Some(queue) if queue.len() > 1 => queue.remove(0),
                    Some(queue) => queue[0].clone(),
                    None => Reply::json(404, r#"{"message": "Not Found"}"#),
                };
                requests.lock().unwrap().push(request);
                write_reply(&mut stream, &reply);
            }
        });

        (platform, log)
    }
}

fn read_request(stream: &TcpStream) -> Request {
    let mut reader = BufReader::new(stream);
    let mut first = String::new();
    reader.read_line(&mut first).unwrap();
    let mut parts = first.split_whitespace();
    let line = format!(
        "{} {}",
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default()
    );

    let mut headers = Vec::new();
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((key, value)) = header.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let request = Request {
        line,
        headers,
        body: Vec::new(),
    };
    let body = if let Some(len) = request.header("content-length") {
        let mut body = vec![0; len.parse().unwrap()];
        reader.read_exact(&mut body).unwrap();
        body
    } else if request.header("transfer-encoding") == Some("chunked") {
        let mut body = Vec::new();
        loop {
            let mut size = String::new();
            reader.read_line(&mut size).unwrap();
            let size = usize::from_str_radix(size.trim(), 16).unwrap();
            let mut chunk = vec![0; size + 2];
            reader.read_exact(&mut chunk).unwrap();
            if size == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..size]);
        }
        body
    } else {
        Vec::new()
    };

    Request { body, ..request }
}

fn write_reply(stream: &mut TcpStream, reply: &Reply) {
    let mut head = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    if let Some(location) = &reply.location {
        head.push_str(&format!("Location: {}\r\n", location));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(reply.body.as_bytes());
    let _ = stream.flush();
}

fn lines(log: &Arc<Mutex<Vec<Request>>>) -> Vec<String> {
    log.lock().unwrap().iter().map(|r| r.line.clone()).collect()
}

fn project() -> ProjectId {
    ProjectId::new("p1")
}

fn model() -> ModelId {
    ModelId::new("m1")
}

#[test]
fn reads_target_type() {
    let (platform, log) = Server::new()
        .route(
            "GET /api/v2/projects/p1/",
            vec![Reply::json(200, r#"{"id": "p1", "targetType": "Binary"}"#)],
        )
        .start();

    assert_eq!(platform.target_type(&project()).unwrap(), TargetType::Binary);
    let requests = log.lock().unwrap();
    assert_eq!(requests[0].header("authorization"), Some("Bearer secret"));
}

#[test]
fn unsupported_target_type() {
    let (platform, _) = Server::new()
        .route(
            "GET /api/v2/projects/p1/",
            vec![Reply::json(200, r#"{"targetType": "Multiclass"}"#)],
        )
        .start();

    assert!(matches!(
        platform.target_type(&project()),
        Err(PlatformError::Data(pecluster::Error::UnsupportedTarget(_)))
    ));
}

#[test]
fn upload_polls_until_redirected() {
    let server = Server::new();
    let status = server.url("status/upload/");
    let dataset = server.url("projects/p1/predictionDatasets/d1/");
    let (platform, log) = server
        .route(
            "POST /api/v2/projects/p1/predictionDatasets/fileUploads/",
            vec![Reply::redirect(202, status)],
        )
        .route(
            "GET /api/v2/status/upload/",
            vec![
                Reply::json(200, r#"{"status": "INITIALIZED"}"#),
                Reply::json(200, r#"{"status": "RUNNING"}"#),
                Reply::redirect(303, dataset),
            ],
        )
        .route(
            "GET /api/v2/projects/p1/predictionDatasets/d1/",
            vec![Reply::json(200, r#"{"id": "d1", "numColumns": 2}"#)],
        )
        .start();

    let data = Table::from_rows(
        vec!["age", "region"],
        vec![
            vec![42.0.into(), "north".into()],
            vec![Cell::Missing, "south".into()],
        ],
    )
    .unwrap();
    let id = platform.upload_dataset(&project(), &data).unwrap();

    assert_eq!(id, DatasetId::new("d1"));
    assert_eq!(
        lines(&log),
        vec![
            "POST /api/v2/projects/p1/predictionDatasets/fileUploads/",
            "GET /api/v2/status/upload/",
            "GET /api/v2/status/upload/",
            "GET /api/v2/status/upload/",
            "GET /api/v2/projects/p1/predictionDatasets/d1/",
        ]
    );
    let upload = String::from_utf8_lossy(&log.lock().unwrap()[0].body).to_string();
    assert!(upload.contains("age,region"));
    assert!(upload.contains("dataset.csv"));
}

#[test]
fn predictions_name_model_and_dataset() {
    let server = Server::new();
    let status = server.url("status/predict/");
    let (platform, log) = server
        .route(
            "POST /api/v2/projects/p1/predictions/",
            vec![Reply::redirect(202, status)],
        )
        .route(
            "GET /api/v2/status/predict/",
            vec![Reply::json(200, r#"{"status": "COMPLETED"}"#)],
        )
        .start();

    platform
        .request_predictions(&project(), &model(), &DatasetId::new("d1"))
        .unwrap();

    let body: Value = serde_json::from_slice(&log.lock().unwrap()[0].body).unwrap();
    assert_eq!(body["modelId"], "m1");
    assert_eq!(body["datasetId"], "d1");
}

#[test]
fn failed_job() {
    let server = Server::new();
    let status = server.url("status/predict/");
    let (platform, _) = server
        .route(
            "POST /api/v2/projects/p1/predictions/",
            vec![Reply::redirect(202, status)],
        )
        .route(
            "GET /api/v2/status/predict/",
            vec![
                Reply::json(200, r#"{"status": "RUNNING"}"#),
                Reply::json(200, r#"{"status": "ERROR"}"#),
            ],
        )
        .start();

    let res = platform.request_predictions(&project(), &model(), &DatasetId::new("d1"));
    assert!(matches!(res, Err(PlatformError::JobFailed { status, .. }) if status == "ERROR"));
}

#[test]
fn job_running_too_long() {
    let server = Server::new();
    let status = server.url("status/predict/");
    let mut config = server.config();
    config.max_wait_secs = 0;
    let platform = HttpPlatform::new(&config, "secret".to_string()).unwrap();
    let (_, _log) = server
        .route(
            "POST /api/v2/projects/p1/predictions/",
            vec![Reply::redirect(202, status)],
        )
        .route(
            "GET /api/v2/status/predict/",
            vec![Reply::json(200, r#"{"status": "RUNNING"}"#)],
        )
        .start();

    let res = platform.request_predictions(&project(), &model(), &DatasetId::new("d1"));
    assert!(matches!(res, Err(PlatformError::Timeout { .. })));
}

#[test]
fn feature_impact_requested_before() {
    let (platform, _) = Server::new()
        .route(
            "POST /api/v2/projects/p1/models/m1/featureImpact/",
            vec![Reply::json(
                422,
                r#"{"message": "Feature Impact is in progress", "errorName": "JobAlreadyAdded"}"#,
            )],
        )
        .start();

    assert!(matches!(
        platform.request_feature_impact(&project(), &model()),
        Err(PlatformError::AlreadyRequested)
    ));
}

#[test]
fn feature_impact_rejected() {
    let (platform, _) = Server::new()
        .route(
            "POST /api/v2/projects/p1/models/m1/featureImpact/",
            vec![Reply::json(422, r#"{"message": "Model does not support feature impact"}"#)],
        )
        .start();

    match platform.request_feature_impact(&project(), &model()) {
        Err(PlatformError::Status { status, body, .. }) => {
            assert_eq!(status, 422);
            assert!(body.contains("does not support"));
        }
        other => panic!("expected a status error, got {:?}", other.err()),
    }
}

#[test]
fn feature_impact_computed() {
    let server = Server::new();
    let status = server.url("status/impact/");
    let impact = server.url("projects/p1/models/m1/featureImpact/");
    let (platform, log) = server
        .route(
            "POST /api/v2/projects/p1/models/m1/featureImpact/",
            vec![Reply::redirect(202, status)],
        )
        .route(
            "GET /api/v2/status/impact/",
            vec![
                Reply::json(200, r#"{"status": "RUNNING"}"#),
                Reply::redirect(303, impact),
            ],
        )
        .start();

    platform.request_feature_impact(&project(), &model()).unwrap();
    assert_eq!(lines(&log).len(), 3);
}

#[test]
fn missing_initialization() {
    let (platform, _) = Server::new().start();

    assert!(matches!(
        platform.explanations_initialization(&project(), &model()),
        Err(PlatformError::NotFound(_))
    ));
}

#[test]
fn existing_initialization() {
    let (platform, _) = Server::new()
        .route(
            "GET /api/v2/projects/p1/models/m1/predictionExplanationsInitialization/",
            vec![Reply::json(200, r#"{"modelId": "m1"}"#)],
        )
        .start();

    platform.explanations_initialization(&project(), &model()).unwrap();
}

#[test]
fn explanations_follow_pages() {
    let server = Server::new();
    let status = server.url("status/explain/");
    let records = server.url("projects/p1/predictionExplanationsRecords/e1/");
    let second = server.url("projects/p1/predictionExplanations/e1/?limit=1000&offset=1");
    let first_page = format!(
        r#"{{"next": "{}", "data": [{{"rowId": 0, "prediction": 3.5,
            "predictionExplanations": [{{"label": "y", "feature": "age", "featureValue": 42,
            "strength": 0.7, "qualitativeStrength": "++"}}]}}]}}"#,
        second
    );
    let second_page = r#"{"next": null, "data": [{"rowId": 1, "prediction": 1.5,
        "predictionExplanations": []}]}"#;

    let (platform, log) = server
        .route(
            "POST /api/v2/projects/p1/predictionExplanations/",
            vec![Reply::redirect(202, status)],
        )
        .route(
            "GET /api/v2/status/explain/",
            vec![Reply::redirect(303, records)],
        )
        .route(
            "GET /api/v2/projects/p1/predictionExplanationsRecords/e1/",
            vec![Reply::json(200, r#"{"id": "e1"}"#)],
        )
        .route(
            "GET /api/v2/projects/p1/predictionExplanations/e1/?limit=1000",
            vec![Reply::json(200, &first_page)],
        )
        .route(
            "GET /api/v2/projects/p1/predictionExplanations/e1/?limit=1000&offset=1",
            vec![Reply::json(200, second_page)],
        )
        .start();

    let id = platform
        .compute_explanations(&project(), &model(), &DatasetId::new("d1"), 2)
        .unwrap();
    assert_eq!(id, ExplanationsId::new("e1"));
    let body: Value = serde_json::from_slice(&log.lock().unwrap()[0].body).unwrap();
    assert_eq!(body["maxExplanations"], 2);

    let table = platform
        .fetch_explanations(&project(), &id, TargetType::Regression, 2)
        .unwrap();
    assert_eq!(table.nrows(), 2);
    assert_eq!(table.ncols(), TargetType::Regression.schema().required_columns(2));
    assert_eq!(table.numeric_column("prediction").unwrap().to_vec(), vec![3.5, 1.5]);
    assert_eq!(
        table.column("explanation_0_feature").unwrap().cloned().collect::<Vec<_>>(),
        vec![Cell::Text("age".into()), Cell::Missing]
    );
}
