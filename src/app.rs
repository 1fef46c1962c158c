use crate::error::{Error, Result};
use crate::serial::{self, BaudRate, PortSession};
use crate::session::{ReaderEvent, SessionHandle};
use crate::settings::Settings;
use crate::timer::{self, IDLE_READING};
use crate::ui;
use crossbeam_channel::Receiver;
use iced::advanced::subscription::{self, EventStream, Recipe};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use iced::widget::scrollable;
use iced::{Element, Subscription, Task, Theme};
use std::collections::VecDeque;
use std::hash::Hash;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum Message {
    // Port selection
    PortSelected(String),
    BaudRateSelected(BaudRate),
    RefreshPorts,
    PortsListed(Vec<String>),

    // Connection
    ToggleConnection,
    Reconnect,

    // Timing
    Pause,
    Tick,

    // Reader thread, tagged with the session generation
    Reader(u64, ReaderEvent),
}

/// Drains the reader thread's channel of one session.
struct ReaderEvents {
    generation: u64,
    events: Receiver<ReaderEvent>,
}

impl Recipe for ReaderEvents {
    type Output = Message;

    fn hash(&self, state: &mut subscription::Hasher) {
        "serial_reader".hash(state);
        self.generation.hash(state);
    }

    fn stream(self: Box<Self>, _input: EventStream) -> BoxStream<'static, Self::Output> {
        let generation = self.generation;
        stream::unfold(self.events, move |rx| async move {
            let blocking = rx.clone();
            // recv blocks, keep it off the executor threads
            match tokio::task::spawn_blocking(move || blocking.recv()).await {
                Ok(Ok(event)) => Some((Message::Reader(generation, event), rx)),
                _ => None,
            }
        })
        .boxed()
    }
}

pub struct App {
    pub(crate) settings: Settings,
    pub(crate) available_ports: Vec<String>,
    pub(crate) selected_port: Option<String>,
    pub(crate) baud_rate: BaudRate,
    pub(crate) log: VecDeque<String>,
    pub(crate) latency: String,
    session: Option<SessionHandle>,
    next_generation: u64,
}

impl App {
    pub fn new(settings: Settings) -> (Self, Task<Message>) {
        let app = Self {
            selected_port: settings.port.clone(),
            baud_rate: settings.baud,
            settings,
            available_ports: vec![],
            log: VecDeque::new(),
            latency: IDLE_READING.to_string(),
            session: None,
            next_generation: 1,
        };
        (app, Task::perform(serial::list_ports(), Message::PortsListed))
    }

    pub fn title(&self) -> String {
        match &self.session {
            Some(session) => format!("Latency Monitor - {}", session.port()),
            None => "Latency Monitor".to_string(),
        }
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn can_pause(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.context().is_timing())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PortSelected(port) => {
                self.selected_port = Some(port);
            }
            Message::BaudRateSelected(rate) => {
                self.baud_rate = rate;
            }
            Message::RefreshPorts => {
                return Task::perform(serial::list_ports(), Message::PortsListed);
            }
            Message::PortsListed(ports) => {
                let keep = self
                    .selected_port
                    .as_ref()
                    .is_some_and(|p| self.settings.port.as_ref() == Some(p) || ports.contains(p));
                if !keep {
                    self.selected_port = ports.first().cloned();
                }
                self.available_ports = ports;
                if self.available_ports.is_empty() {
                    self.push_log("No serial ports found".to_string());
                }
            }
            Message::ToggleConnection => {
                if self.is_connected() {
                    self.disconnect();
                } else {
                    self.connect();
                }
                return self.scroll_to_end();
            }
            Message::Reconnect => {
                self.disconnect();
                self.reset_state();
                self.connect();
                return self.scroll_to_end();
            }
            Message::Pause => {
                self.pause();
                return self.scroll_to_end();
            }
            Message::Tick => {
                self.refresh_latency();
            }
            Message::Reader(generation, event) => {
                return self.on_reader_event(generation, event);
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<Message> {
        ui::view(self)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let Some(session) = &self.session else {
            return Subscription::none();
        };

        let reader = subscription::from_recipe(ReaderEvents {
            generation: session.generation(),
            events: session.events(),
        });

        if session.context().is_timing() {
            let tick = iced::time::every(self.settings.tick()).map(|_| Message::Tick);
            Subscription::batch([reader, tick])
        } else {
            reader
        }
    }

    fn connect(&mut self) {
        if let Err(e) = self.try_connect() {
            warn!("connection failed: {}", e);
            self.push_log(format!("Connection failed: {}", e));
        }
    }

    fn try_connect(&mut self) -> Result<()> {
        let port = self.selected_port.clone().ok_or(Error::NoPortSelected)?;
        let source = PortSession::open(&port, self.baud_rate, self.settings.read_timeout())?;
        self.attach(SessionHandle::spawn(source, &port, self.next_generation)?);
        self.push_log(format!("Connected to {} at {} baud", port, self.baud_rate));
        Ok(())
    }

    fn attach(&mut self, session: SessionHandle) {
        info!(port = session.port(), generation = session.generation(), "session started");
        self.next_generation = session.generation() + 1;
        self.session = Some(session);
    }

    // Waits for the reader so the device is free for the next connect.
    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close_and_wait();
            self.push_log("Disconnected".to_string());
        }
    }

    fn reset_state(&mut self) {
        self.log.clear();
        self.latency = IDLE_READING.to_string();
    }

    fn pause(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if let Some(elapsed) = session.context().pause() {
            info!(elapsed = ?elapsed, "timing paused");
            self.latency = timer::format_elapsed(elapsed);
            self.push_log("Timing paused".to_string());
        }
    }

    fn refresh_latency(&mut self) {
        if let Some(elapsed) = self.session.as_ref().and_then(|s| s.context().elapsed()) {
            self.latency = timer::format_elapsed(elapsed);
        }
    }

    fn on_reader_event(&mut self, generation: u64, event: ReaderEvent) -> Task<Message> {
        if self.session.as_ref().map(SessionHandle::generation) != Some(generation) {
            debug!(generation, ?event, "dropping event from a closed session");
            return Task::none();
        }

        match event {
            ReaderEvent::Line(line) => self.push_log(line),
            ReaderEvent::Triggered => {
                self.refresh_latency();
                self.push_log("Timing started, stopped receiving data".to_string());
            }
            ReaderEvent::ReadFailed(e) => {
                self.push_log(format!("Read error: {}", e));
                self.disconnect();
            }
            ReaderEvent::Stopped => return Task::none(),
        }
        self.scroll_to_end()
    }

    fn push_log(&mut self, line: String) {
        self.log.push_back(line);
        while self.log.len() > self.settings.max_log_lines.max(1) {
            self.log.pop_front();
        }
    }

    fn scroll_to_end(&self) -> Task<Message> {
        scrollable::snap_to(ui::log_id(), scrollable::RelativeOffset::END)
    }
}
