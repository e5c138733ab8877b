use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use news_reels::http::parse_base_url;
use news_reels::model::Article;
use news_reels::news::{NewsApiClient, NewsSource};
use news_reels::script::{GeminiScriptGenerator, ScriptGenerator};
use news_reels::video::{PexelsVideoFinder, StockVideoFinder};
use news_reels::voice::{AudioStore, ElevenLabsSynthesizer, VoiceSynthesizer};
use news_reels::ReelError;

const TIMEOUT: Duration = Duration::from_secs(5);

fn news_client(server: &MockServer) -> NewsApiClient {
    NewsApiClient::new(
        "news-key".into(),
        parse_base_url(&server.uri()).unwrap(),
        "us".into(),
        TIMEOUT,
    )
    .unwrap()
}

fn article() -> Article {
    Article {
        title: "Chip maker unveils new processor".into(),
        description: "A faster and cooler chip.".into(),
        content: String::new(),
        url: "https://news.example/chip".into(),
        image_url: None,
        source: "Example Wire".into(),
        author: None,
        published_at: None,
    }
}

#[tokio::test]
async fn headlines_are_filtered_and_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(header("X-Api-Key", "news-key"))
        .and(query_param("category", "technology"))
        .and(query_param("country", "us"))
        .and(query_param("pageSize", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "totalResults": 3,
            "articles": [
                {
                    "source": { "id": null, "name": "The Verge" },
                    "author": "Sam",
                    "title": "Chip maker unveils new processor",
                    "description": "A faster and cooler chip.",
                    "url": "https://news.example/chip",
                    "urlToImage": "https://img.example/chip.jpg",
                    "publishedAt": "2024-08-01T10:00:00Z",
                    "content": "Full text"
                },
                {
                    "source": { "name": "Nobody" },
                    "title": "No description here",
                    "description": null,
                    "url": "https://news.example/nodesc"
                },
                {
                    "source": null,
                    "title": "Anonymous story",
                    "description": "Source missing.",
                    "url": "https://news.example/anon"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let articles = news_client(&server)
        .fetch_headlines("technology", "us", 3)
        .await
        .unwrap();

    assert_eq!(articles.len(), 2);
    let first = &articles[0];
    assert_eq!(first.source, "The Verge");
    assert_eq!(first.image_url.as_deref(), Some("https://img.example/chip.jpg"));
    assert_eq!(first.author.as_deref(), Some("Sam"));
    assert!(first.published_at.is_some());
    assert_eq!(articles[1].source, "Unknown");
}

#[tokio::test]
async fn newsapi_error_status_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid"
        })))
        .mount(&server)
        .await;

    let err = news_client(&server)
        .fetch_headlines("general", "us", 5)
        .await
        .unwrap_err();

    match err {
        ReelError::Upstream(msg) => assert!(msg.contains("Your API key is invalid"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn keyword_search_uses_everything_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("q", "solar"))
        .and(query_param("sortBy", "publishedAt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": [{
                "source": { "name": "Wire" },
                "title": "Solar record",
                "description": "Panels everywhere.",
                "url": "https://news.example/solar"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let articles = news_client(&server).search("solar", 5).await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Solar record");
}

#[tokio::test]
async fn gemini_output_is_parsed_into_a_script() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-pro:generateContent"))
        .and(header("x-goog-api-key", "gem-key"))
        .and(body_partial_json(json!({ "contents": [{ "parts": [{}] }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{
                    "text": "Scene: [close-up of a chip]\nNarrator: Chips just got faster.\n\nScene: factory floor"
                }] }
            }]
        })))
        .mount(&server)
        .await;

    let generator = GeminiScriptGenerator::new(
        "gem-key".into(),
        parse_base_url(&server.uri()).unwrap(),
        "gemini-pro".into(),
        TIMEOUT,
    )
    .unwrap();
    let script = generator.generate(&article()).await.unwrap();

    assert_eq!(script.scene_cues, vec!["close-up of a chip", "factory floor"]);
    assert_eq!(script.narration, "Chips just got faster.");
    assert_eq!(script.estimated_duration, "60 seconds");
}

#[tokio::test]
async fn empty_gemini_output_is_a_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let generator = GeminiScriptGenerator::new(
        "gem-key".into(),
        parse_base_url(&server.uri()).unwrap(),
        "gemini-pro".into(),
        TIMEOUT,
    )
    .unwrap();
    let err = generator.generate(&article()).await.unwrap_err();
    assert!(matches!(err, ReelError::Generation(_)));
}

fn synthesizer(server: &MockServer, dir: &std::path::Path) -> ElevenLabsSynthesizer {
    ElevenLabsSynthesizer::new(
        "xi-key".into(),
        parse_base_url(&server.uri()).unwrap(),
        "voice-1".into(),
        "eleven_monolingual_v1".into(),
        AudioStore::new(dir, "/static"),
        TIMEOUT,
    )
    .unwrap()
}

#[tokio::test]
async fn synthesized_audio_is_written_to_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1"))
        .and(header("xi-api-key", "xi-key"))
        .and(body_partial_json(json!({
            "text": "Chips just got faster.",
            "model_id": "eleven_monolingual_v1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-fake-mp3".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let asset = synthesizer(&server, dir.path())
        .synthesize("Scene: Chips   just got faster")
        .await
        .unwrap();

    let file_name = AudioStore::file_name("voice-1", "Chips just got faster.");
    assert_eq!(asset.url, format!("/static/audio/{file_name}"));
    assert_eq!(asset.voice_id, "voice-1");
    assert_eq!(asset.text_length, "Chips just got faster.".len());
    let written = std::fs::read(dir.path().join(&file_name)).unwrap();
    assert_eq!(written, b"ID3-fake-mp3");
}

#[tokio::test]
async fn provider_failure_is_a_synthesis_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let err = synthesizer(&server, dir.path())
        .synthesize("Hello there")
        .await
        .unwrap_err();

    match err {
        ReelError::Synthesis(msg) => assert!(msg.contains("quota exceeded"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn unwritable_audio_store_is_a_synthesis_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-fake-mp3".to_vec()))
        .mount(&server)
        .await;
    // A regular file where the audio directory should be.
    let blocker = tempfile::NamedTempFile::new().unwrap();

    let err = synthesizer(&server, blocker.path())
        .synthesize("Hello there")
        .await
        .unwrap_err();

    assert!(matches!(err, ReelError::Synthesis(_)), "{err:?}");
}

#[tokio::test]
async fn voices_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [
                { "voice_id": "v1", "name": "Rachel", "category": "premade" },
                { "voice_id": "v2", "name": "Custom" }
            ]
        })))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let voices = synthesizer(&server, dir.path()).list_voices().await.unwrap();
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].category.as_deref(), Some("premade"));
    assert!(voices[1].category.is_none());
}

fn finder(server: &MockServer) -> PexelsVideoFinder {
    PexelsVideoFinder::new(
        "px-key".into(),
        parse_base_url(&server.uri()).unwrap(),
        TIMEOUT,
    )
    .unwrap()
}

#[tokio::test]
async fn pexels_picks_the_hd_rendition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/search"))
        .and(header("Authorization", "px-key"))
        .and(query_param("query", "city skyline"))
        .and(query_param("orientation", "portrait"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "videos": [{
                "id": 7,
                "url": "https://www.pexels.com/video/7/",
                "image": "https://images.pexels.com/7.jpg",
                "duration": 14,
                "user": { "name": "Ana" },
                "video_files": [
                    { "link": "https://cdn.example/7-sd.mp4", "width": 540, "height": 960 },
                    { "link": "https://cdn.example/7-hd.mp4", "width": 1920, "height": 1080 }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let clip = finder(&server)
        .find_for_cue("city skyline")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(clip.url, "https://cdn.example/7-hd.mp4");
    assert_eq!(clip.attribution, "Ana");
    assert_eq!(clip.cue, "city skyline");
}

#[tokio::test]
async fn pexels_without_matches_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "videos": [] })))
        .mount(&server)
        .await;

    assert!(finder(&server).find_for_cue("nothing").await.unwrap().is_none());
}

#[tokio::test]
async fn pexels_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = finder(&server).find_for_cue("anything").await.unwrap_err();
    assert!(err.is_upstream());
}
