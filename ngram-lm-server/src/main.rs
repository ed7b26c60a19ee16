use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware, post, put, web};
use env_logger::Env;
use log::{error, info};

use serde::Deserialize;
use ngram_lm_core::experiment::{ExperimentSettings, load_corpus};
use ngram_lm_core::io::{add_sentence_tokens, tokenize_lines};
use ngram_lm_core::model::{NGramModel, Order};

/// Query parameters of the `/v1/train` endpoint.
///
/// Missing model options fall back to `ExperimentSettings::default()`.
#[derive(Deserialize)]
struct TrainParams {
	train: Option<String>,
	n: Option<usize>,
	smoothing: Option<String>,
	k: Option<f64>,
	lambda: Option<f64>,
	minfreq: Option<usize>,
}

/// Query parameters of the `/v1/probability` endpoint.
#[derive(Deserialize)]
struct ProbabilityParams {
	word: String,
	history: Option<String>,
}

/// Model published to the handlers.
///
/// `None` until a first training request succeeds. A fitted model is only
/// ever replaced as a whole, under the write lock.
struct SharedData {
	model: Option<NGramModel>,
}

impl TrainParams {
	fn settings(&self) -> ExperimentSettings {
		let default = ExperimentSettings::default();
		ExperimentSettings {
			n: self.n.unwrap_or(default.n),
			smoothing: self.smoothing.clone().unwrap_or(default.smoothing),
			k: self.k.unwrap_or(default.k),
			lambda: self.lambda.unwrap_or(default.lambda),
			minfreq: self.minfreq.unwrap_or(default.minfreq),
		}
	}
}

/// Formats a perplexity or probability for a plain-text response.
fn format_value(value: f64) -> String {
	if value.is_infinite() { "inf".to_owned() } else { value.to_string() }
}

/// HTTP PUT endpoint `/v1/train`
///
/// Fits a new model on a corpus file and replaces the published one.
#[put("/v1/train")]
async fn put_train(data: web::Data<RwLock<SharedData>>, query: web::Query<TrainParams>) -> impl Responder {
	let path = match &query.train {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty training corpus path"),
	};

	let config = match query.settings().to_config() {
		Ok(c) => c,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let sentences = match load_corpus(path) {
		Ok(s) => s,
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to read corpus: {e}")),
	};

	// Fit before taking the lock, readers keep the previous model meanwhile
	let mut model = NGramModel::new(config);
	if let Err(e) = model.fit(&sentences) {
		return HttpResponse::InternalServerError().body(e);
	}
	let vocab_size = model.vocabulary().len();

	let mut shared_data = match data.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	shared_data.model = Some(model);
	info!("published model trained on {} ({} sentences)", path, sentences.len());

	HttpResponse::Ok().body(format!("Model trained, vocabulary size {}", vocab_size))
}

#[get("/v1/vocabulary")]
async fn get_vocabulary(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match &shared_data.model {
		Some(model) => HttpResponse::Ok().body(format!(
			"size={}\ntotal_tokens={}",
			model.vocabulary().len(),
			model.total_tokens()
		)),
		None => HttpResponse::Conflict().body("No model trained"),
	}
}

/// HTTP GET endpoint `/v1/probability`
///
/// Query tokens are lowercased and normalized against the vocabulary.
/// With a `history` and a bigram model, returns P(word | history),
/// otherwise P(word).
#[get("/v1/probability")]
async fn get_probability(data: web::Data<RwLock<SharedData>>, query: web::Query<ProbabilityParams>) -> impl Responder {
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model trained");
	};

	let word = model.normalize(&[query.word.trim().to_lowercase()]).remove(0);
	let probability = match &query.history {
		Some(history) if model.config().order() == Order::Bigram => {
			let history = model.normalize(&[history.trim().to_lowercase()]).remove(0);
			model.bigram_probability(&history, &word)
		}
		_ => model.unigram_probability(&word),
	};

	HttpResponse::Ok().body(format_value(probability))
}

/// HTTP POST endpoint `/v1/perplexity`
///
/// The body is plain text, one sentence per line.
#[post("/v1/perplexity")]
async fn post_perplexity(data: web::Data<RwLock<SharedData>>, body: String) -> impl Responder {
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model trained");
	};

	let sentences = model.normalize_all(&add_sentence_tokens(tokenize_lines(&body, true)));
	HttpResponse::Ok().body(format_value(model.perplexity(&sentences)))
}

fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(put_train)
		.service(get_vocabulary)
		.service(get_probability)
		.service(post_perplexity);
}

/// Main entry point for the server.
///
/// Starts without a model; clients train one through `/v1/train`.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Log filter is read from `RUST_LOG` (default `info`).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let shared_model = web::Data::new(RwLock::new(SharedData { model: None }));

	info!("listening on 127.0.0.1:5000");
	let server = HttpServer::new(move || {
		App::new()
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.configure(configure)
	})
		.bind(("127.0.0.1", 5000));

	match server {
		Ok(server) => server.run().await,
		Err(e) => {
			error!("failed to bind: {e}");
			Err(e)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::{http::StatusCode, test};
	use std::io::Write;

	const TRAIN: &str = "the cat sat\nthe dog sat\nthe cat ran\n";

	fn state() -> web::Data<RwLock<SharedData>> {
		web::Data::new(RwLock::new(SharedData { model: None }))
	}

	#[actix_web::test]
	async fn queries_need_a_model() {
		let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

		let req = test::TestRequest::get().uri("/v1/vocabulary").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

		let req = test::TestRequest::post().uri("/v1/perplexity").set_payload("the cat").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
	}

	#[actix_web::test]
	async fn train_then_query() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(TRAIN.as_bytes()).unwrap();
		let path = file.path().to_str().unwrap().to_owned();

		let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

		let req = test::TestRequest::put()
			.uri(&format!("/v1/train?train={}&n=2&smoothing=none&minfreq=1", path))
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		// P(cat | the) = 2/3
		let req = test::TestRequest::get().uri("/v1/probability?word=cat&history=The").to_request();
		let body = test::call_and_read_body(&app, req).await;
		let p: f64 = std::str::from_utf8(&body).unwrap().parse().unwrap();
		assert!((p - 2.0 / 3.0).abs() < 1e-9);

		let req = test::TestRequest::post().uri("/v1/perplexity").set_payload("the dog ran\n").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(&body[..], b"inf");

		let req = test::TestRequest::post().uri("/v1/perplexity").set_payload("the cat sat\n").to_request();
		let body = test::call_and_read_body(&app, req).await;
		let pp: f64 = std::str::from_utf8(&body).unwrap().parse().unwrap();
		assert!(pp.is_finite() && pp >= 1.0);
	}

	#[actix_web::test]
	async fn invalid_training_requests() {
		let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

		let req = test::TestRequest::put().uri("/v1/train").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::put().uri("/v1/train?train=x.txt&n=3").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::put().uri("/v1/train?train=x.txt&smoothing=interp&lambda=2").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
	}
}
