//! Scripted in-memory surface for unit testing without a live browser.
//!
//! Provides a [`PageSurface`] whose page state is a plain element table
//! mutated by effect hooks attached to clicks and key presses. Tests build a
//! surface, script the page through the paired controller, and assert on the
//! recorded action log afterwards.
//!
//! # Example
//!
//! ```ignore
//! let (surface, controller) = FakeSurface::scripted();
//! controller.add_entry("[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]");
//! controller.add_button("[data-testid=\"postButton\"]");
//! controller.on_click("[data-testid=\"postButton\"]", vec![Effect::SetUrl("https://surface.example/u/status/123456789012345678".into())]);
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Result, RuntimeError};
use crate::launcher::{SessionBlob, SurfaceFactory};
use crate::profile::LaunchProfile;
use crate::surface::{NetworkCapture, PageSurface};

/// One scripted state change applied when its hook fires.
#[derive(Debug, Clone)]
pub enum Effect {
	SetUrl(String),
	AddElement { selector: String, state: ElementState },
	RemoveElement(String),
	SetText { selector: String, text: String },
	SetEnabled { selector: String, enabled: bool },
	PushCapture(NetworkCapture),
	AddAnchor(String),
	Disconnect,
	Fail(String),
}

/// Interactive state of one fake element.
#[derive(Debug, Clone)]
pub struct ElementState {
	pub visible: bool,
	pub editable: bool,
	pub enabled: bool,
	pub text: String,
}

impl ElementState {
	/// A visible, empty, editable entry element.
	pub fn entry() -> Self {
		Self {
			visible: true,
			editable: true,
			enabled: true,
			text: String::new(),
		}
	}

	/// A visible, enabled, non-editable control.
	pub fn button() -> Self {
		Self {
			visible: true,
			editable: false,
			enabled: true,
			text: String::new(),
		}
	}
}

/// One recorded surface operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	Goto(String),
	Reload,
	Click(String),
	Clear(String),
	Type { selector: String, text: String },
	Press(String),
	Close,
}

#[derive(Default, Debug)]
struct FakeState {
	url: String,
	connected: bool,
	elements: BTreeMap<String, ElementState>,
	anchors: Vec<String>,
	captures: VecDeque<NetworkCapture>,
	on_click: HashMap<String, VecDeque<Vec<Effect>>>,
	on_press: HashMap<String, VecDeque<Vec<Effect>>>,
	actions: Vec<Action>,
}

impl FakeState {
	fn apply(&mut self, effects: Vec<Effect>) -> Result<()> {
		for effect in effects {
			match effect {
				Effect::SetUrl(url) => self.url = url,
				Effect::AddElement { selector, state } => {
					self.elements.insert(selector, state);
				}
				Effect::RemoveElement(selector) => {
					self.elements.remove(&selector);
				}
				Effect::SetText { selector, text } => {
					if let Some(element) = self.elements.get_mut(&selector) {
						element.text = text;
					}
				}
				Effect::SetEnabled { selector, enabled } => {
					if let Some(element) = self.elements.get_mut(&selector) {
						element.enabled = enabled;
					}
				}
				Effect::PushCapture(capture) => self.captures.push_back(capture),
				Effect::AddAnchor(href) => self.anchors.push(href),
				Effect::Disconnect => self.connected = false,
				Effect::Fail(message) => return Err(RuntimeError::Driver(message)),
			}
		}
		Ok(())
	}
}

/// Scripted [`PageSurface`] implementation backed by shared in-memory state.
#[derive(Debug)]
pub struct FakeSurface {
	state: Arc<Mutex<FakeState>>,
}

impl FakeSurface {
	/// Builds a connected surface and the controller that scripts it.
	pub fn scripted() -> (Arc<FakeSurface>, FakeSurfaceController) {
		let state = Arc::new(Mutex::new(FakeState {
			url: "https://surface.example/home".to_string(),
			connected: true,
			..FakeState::default()
		}));
		let surface = Arc::new(FakeSurface { state: Arc::clone(&state) });
		(surface, FakeSurfaceController { state })
	}

	fn ensure_connected(&self) -> Result<()> {
		if self.state.lock().connected { Ok(()) } else { Err(RuntimeError::Disconnected) }
	}
}

#[async_trait]
impl PageSurface for FakeSurface {
	async fn goto(&self, url: &str) -> Result<()> {
		self.ensure_connected()?;
		let mut state = self.state.lock();
		state.actions.push(Action::Goto(url.to_string()));
		state.url = url.to_string();
		Ok(())
	}

	async fn url(&self) -> Result<String> {
		self.ensure_connected()?;
		Ok(self.state.lock().url.clone())
	}

	async fn reload(&self) -> Result<()> {
		self.ensure_connected()?;
		self.state.lock().actions.push(Action::Reload);
		Ok(())
	}

	async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			self.ensure_connected()?;
			if self.state.lock().elements.contains_key(selector) {
				return Ok(true);
			}
			if tokio::time::Instant::now() >= deadline {
				return Ok(false);
			}
			tokio::time::sleep(Duration::from_millis(20)).await;
		}
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		self.ensure_connected()?;
		Ok(self.state.lock().elements.get(selector).is_some_and(|element| element.visible))
	}

	async fn is_editable(&self, selector: &str) -> Result<bool> {
		self.ensure_connected()?;
		Ok(self.state.lock().elements.get(selector).is_some_and(|element| element.editable))
	}

	async fn is_enabled(&self, selector: &str) -> Result<bool> {
		self.ensure_connected()?;
		Ok(self.state.lock().elements.get(selector).is_some_and(|element| element.enabled))
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.ensure_connected()?;
		let mut state = self.state.lock();
		state.actions.push(Action::Click(selector.to_string()));
		if !state.elements.contains_key(selector) {
			return Err(RuntimeError::driver(format!("no element matching {selector}")));
		}
		let effects = state.on_click.get_mut(selector).and_then(VecDeque::pop_front).unwrap_or_default();
		state.apply(effects)
	}

	async fn clear(&self, selector: &str) -> Result<()> {
		self.ensure_connected()?;
		let mut state = self.state.lock();
		state.actions.push(Action::Clear(selector.to_string()));
		match state.elements.get_mut(selector) {
			Some(element) => {
				element.text.clear();
				Ok(())
			}
			None => Err(RuntimeError::driver(format!("no element matching {selector}"))),
		}
	}

	async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
		self.ensure_connected()?;
		let mut state = self.state.lock();
		state.actions.push(Action::Type {
			selector: selector.to_string(),
			text: text.to_string(),
		});
		match state.elements.get_mut(selector) {
			Some(element) if element.editable => {
				element.text.push_str(text);
				Ok(())
			}
			Some(_) => Err(RuntimeError::driver(format!("element not editable: {selector}"))),
			None => Err(RuntimeError::driver(format!("no element matching {selector}"))),
		}
	}

	async fn press(&self, key: &str) -> Result<()> {
		self.ensure_connected()?;
		let mut state = self.state.lock();
		state.actions.push(Action::Press(key.to_string()));
		let effects = state.on_press.get_mut(key).and_then(VecDeque::pop_front).unwrap_or_default();
		state.apply(effects)
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		self.ensure_connected()?;
		Ok(self.state.lock().elements.get(selector).map(|element| element.text.clone()))
	}

	async fn anchor_hrefs(&self) -> Result<Vec<String>> {
		self.ensure_connected()?;
		Ok(self.state.lock().anchors.clone())
	}

	async fn drain_captures(&self) -> Result<Vec<NetworkCapture>> {
		self.ensure_connected()?;
		Ok(self.state.lock().captures.drain(..).collect())
	}

	fn is_connected(&self) -> bool {
		self.state.lock().connected
	}

	async fn close(&self) -> Result<()> {
		let mut state = self.state.lock();
		state.actions.push(Action::Close);
		state.connected = false;
		Ok(())
	}
}

/// Scripts and inspects a paired [`FakeSurface`].
pub struct FakeSurfaceController {
	state: Arc<Mutex<FakeState>>,
}

impl FakeSurfaceController {
	pub fn set_url(&self, url: impl Into<String>) {
		self.state.lock().url = url.into();
	}

	pub fn add_element(&self, selector: impl Into<String>, element: ElementState) {
		self.state.lock().elements.insert(selector.into(), element);
	}

	pub fn add_entry(&self, selector: impl Into<String>) {
		self.add_element(selector, ElementState::entry());
	}

	pub fn add_button(&self, selector: impl Into<String>) {
		self.add_element(selector, ElementState::button());
	}

	pub fn remove_element(&self, selector: &str) {
		self.state.lock().elements.remove(selector);
	}

	pub fn element_text(&self, selector: &str) -> Option<String> {
		self.state.lock().elements.get(selector).map(|element| element.text.clone())
	}

	pub fn add_anchor(&self, href: impl Into<String>) {
		self.state.lock().anchors.push(href.into());
	}

	pub fn push_capture(&self, url: impl Into<String>, body: Value) {
		self.state.lock().captures.push_back(NetworkCapture { url: url.into(), body });
	}

	/// Queues `effects` for the next unconsumed click on `selector`.
	///
	/// Each call queues one entry; successive clicks pop entries in order.
	pub fn on_click(&self, selector: impl Into<String>, effects: Vec<Effect>) {
		self.state.lock().on_click.entry(selector.into()).or_default().push_back(effects);
	}

	/// Queues `effects` for the next unconsumed press of `key`.
	pub fn on_press(&self, key: impl Into<String>, effects: Vec<Effect>) {
		self.state.lock().on_press.entry(key.into()).or_default().push_back(effects);
	}

	pub fn disconnect(&self) {
		self.state.lock().connected = false;
	}

	pub fn actions(&self) -> Vec<Action> {
		self.state.lock().actions.clone()
	}
}

/// [`SurfaceFactory`] handing out pre-scripted fake surfaces in order.
///
/// `fail_profiles` makes named ladder profiles fail, for exercising launch
/// degradation from the outside.
pub struct FakeFactory {
	surfaces: Mutex<VecDeque<Arc<FakeSurface>>>,
	fail_profiles: Vec<&'static str>,
	launches: AtomicU64,
	cleanups: AtomicU64,
}

impl FakeFactory {
	pub fn new() -> Self {
		Self {
			surfaces: Mutex::new(VecDeque::new()),
			fail_profiles: Vec::new(),
			launches: AtomicU64::new(0),
			cleanups: AtomicU64::new(0),
		}
	}

	pub fn with_fail_profiles(mut self, profiles: Vec<&'static str>) -> Self {
		self.fail_profiles = profiles;
		self
	}

	/// Queues a surface to be handed out by the next successful launch.
	pub fn push(&self, surface: Arc<FakeSurface>) {
		self.surfaces.lock().push_back(surface);
	}

	pub fn launches(&self) -> u64 {
		self.launches.load(Ordering::SeqCst)
	}

	pub fn cleanups(&self) -> u64 {
		self.cleanups.load(Ordering::SeqCst)
	}
}

impl Default for FakeFactory {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl SurfaceFactory for FakeFactory {
	async fn launch(&self, profile: &LaunchProfile, _auth: Option<&SessionBlob>) -> Result<Arc<dyn PageSurface>> {
		self.launches.fetch_add(1, Ordering::SeqCst);
		if self.fail_profiles.contains(&profile.name) {
			return Err(RuntimeError::driver(format!("scripted failure for profile {}", profile.name)));
		}
		match self.surfaces.lock().pop_front() {
			Some(surface) => Ok(surface),
			None => {
				let (surface, _controller) = FakeSurface::scripted();
				Ok(surface)
			}
		}
	}

	async fn cleanup(&self) {
		self.cleanups.fetch_add(1, Ordering::SeqCst);
	}
}
