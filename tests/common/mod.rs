//! Shared fakes and fixtures for the integration tests.

#![allow(dead_code)]

use anyhow::{Result, bail};
use image::{Rgb, RgbImage};
use medreel::image_search::{ImageSearch, SearchChain};
use medreel::keywords::KeywordExtractor;
use medreel::speech::{SpeechEngine, Translator};
use medreel::summarizer::{LeadSummarizer, SummaryLength};
use medreel::video_generator::{FRAME_RATE, Renderer, Slideshow};
use medreel::{Config, Language, Stages, http};
use std::cell::RefCell;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// What the fake renderer was asked to encode.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub sources: Vec<PathBuf>,
    pub per_image_duration: f64,
    pub video_duration: f64,
}

/// Reports a fixed audio duration and records every render instead of
/// encoding. Writes a small file at the output path.
#[derive(Clone)]
pub struct FakeRenderer {
    pub audio_seconds: f64,
    pub fail: bool,
    pub renders: Rc<RefCell<Vec<Rendered>>>,
}

impl FakeRenderer {
    pub fn new(audio_seconds: f64) -> Self {
        FakeRenderer {
            audio_seconds,
            fail: false,
            renders: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn failing(audio_seconds: f64) -> Self {
        FakeRenderer {
            fail: true,
            ..FakeRenderer::new(audio_seconds)
        }
    }

    pub fn last(&self) -> Rendered {
        self.renders.borrow().last().cloned().expect("nothing was rendered")
    }
}

impl Renderer for FakeRenderer {
    fn audio_duration(&self, _audio: &Path) -> Result<f64> {
        Ok(self.audio_seconds)
    }

    fn render(&self, slideshow: &Slideshow, _audio: &Path, output: &Path) -> Result<()> {
        if self.fail {
            bail!("encoder crashed");
        }
        self.renders.borrow_mut().push(Rendered {
            sources: slideshow.clips.iter().map(|c| c.source.clone()).collect(),
            per_image_duration: slideshow.per_image_duration,
            video_duration: slideshow.frame_count(FRAME_RATE) as f64 / FRAME_RATE as f64,
        });
        fs::write(output, b"fake video")?;
        Ok(())
    }
}

/// Records translation and synthesis requests.
#[derive(Clone, Default)]
pub struct FakeVoice {
    pub translated: Rc<RefCell<Vec<(String, Language)>>>,
    pub spoken: Rc<RefCell<Vec<(String, Language)>>>,
}

impl Translator for FakeVoice {
    fn translate(&self, text: &str, target: Language) -> Result<String> {
        self.translated.borrow_mut().push((text.to_string(), target));
        Ok(format!("({}) {}", target.code(), text))
    }
}

impl SpeechEngine for FakeVoice {
    fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        self.spoken.borrow_mut().push((text.to_string(), language));
        Ok(b"ID3 fake mp3".to_vec())
    }
}

/// Returns the same links for every keyword.
pub struct FixedLinks(pub Vec<String>);

impl ImageSearch for FixedLinks {
    fn name(&self) -> &str {
        "fixed links"
    }

    fn search(&self, _keyword: &str, count: usize) -> Result<Vec<String>> {
        Ok(self.0.iter().take(count).cloned().collect())
    }
}

/// Working directories for one pipeline run.
pub struct Workspace {
    pub root: TempDir,
    pub config: Config,
}

pub fn workspace(language: Language) -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let config = Config {
        input_file: root.path().join("report.pdf"),
        images_dir: root.path().join("images"),
        static_dir: root.path().join("static"),
        language,
        ..Config::default()
    };
    Workspace { root, config }
}

/// Offline stages: lead summarizer, default keywords, the given search
/// links, fake voice and fake renderer.
pub fn offline_stages(links: Vec<String>, voice: &FakeVoice, renderer: &FakeRenderer) -> Stages {
    Stages {
        client: http::build_client(Duration::from_secs(1)).unwrap(),
        summarizer: Box::new(LeadSummarizer::new(SummaryLength::default())),
        keywords: KeywordExtractor::default(),
        search: SearchChain::new(vec![Box::new(FixedLinks(links))]),
        translator: Box::new(voice.clone()),
        speech: Box::new(voice.clone()),
        renderer: Box::new(renderer.clone()),
    }
}

pub fn write_png(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    RgbImage::from_pixel(32, 24, Rgb(color))
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"definitely not an image").unwrap();
    path
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Writes a minimal PDF with one line of text per page.
pub fn write_pdf(path: &Path, lines: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for line in lines {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// One request received by [`LocalServer`].
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    /// Decoded query parameters.
    pub fn query(&self) -> Vec<(String, String)> {
        let url = reqwest::Url::parse(&format!("http://localhost{}", self.target)).unwrap();
        url.query_pairs().into_owned().collect()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.query().into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned response for [`LocalServer`].
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Reply {
            status: 200,
            content_type,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Reply {
            status,
            content_type: "text/plain",
            body: b"error".to_vec(),
        }
    }
}

/// A plain HTTP/1.1 server on a random local port that answers every request
/// with `handler` and records what it saw.
pub struct LocalServer {
    pub base: String,
    pub requests: Arc<Mutex<Vec<Request>>>,
}

impl LocalServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn serve<F>(handler: F) -> LocalServer
where
    F: Fn(&Request) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let Some(request) = read_request(&stream) else { continue };
            let reply = handler(&request);
            seen.lock().unwrap().push(request);
            let mut stream = stream;
            let head = format!(
                "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reply.status,
                reply.content_type,
                reply.body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&reply.body);
        }
    });

    LocalServer { base, requests }
}

fn read_request(stream: &TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Request {
        method,
        target,
        headers,
        body,
    })
}

/// PNG bytes of a small solid image.
pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(16, 12, Rgb(color))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}
