use scene_core::{
    AudioBackend, AudioConfig, AudioError, GraphMode, MediaSource, PendingResult, Ramp,
    CHANNEL_COUNT,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// Nodes that exist only when the processing graph could be built.
struct Routing {
    audio_ctx: web::AudioContext,
    channel_gains: Vec<web::GainNode>,
    master_gain: web::GainNode,
    analyser: web::AnalyserNode,
    // kept alive for the lifetime of the graph
    _sources: Vec<web::MediaElementAudioSourceNode>,
}

/// [`AudioBackend`] over two `<audio>` elements and a WebAudio graph.
pub struct WebAudioBackend {
    config: AudioConfig,
    elements: Vec<web::HtmlAudioElement>,
    probe: Option<web::HtmlAudioElement>,
    routing: Option<Routing>,
}

impl WebAudioBackend {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            elements: Vec::new(),
            probe: None,
            routing: None,
        }
    }

    fn element(&self, channel: usize) -> Option<&web::HtmlAudioElement> {
        self.elements.get(channel)
    }

    fn channel_gain(&self, channel: usize) -> Option<&web::GainNode> {
        self.routing.as_ref().and_then(|r| r.channel_gains.get(channel))
    }
}

fn create_element() -> Result<web::HtmlAudioElement, AudioError> {
    let el = web::HtmlAudioElement::new()
        .map_err(|e| AudioError::Unavailable(format!("audio element: {:?}", e)))?;
    el.set_cross_origin(Some("anonymous"));
    el.set_preload("auto");
    el.set_loop(true);
    Ok(el)
}

fn create_elements() -> Result<Vec<web::HtmlAudioElement>, AudioError> {
    (0..CHANNEL_COUNT).map(|_| create_element()).collect()
}

fn create_gain(
    audio_ctx: &web::AudioContext,
    value: f32,
    label: &str,
) -> Result<web::GainNode, ()> {
    match web::GainNode::new(audio_ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Ok(g)
        }
        Err(e) => {
            log::error!("{} GainNode error: {:?}", label, e);
            Err(())
        }
    }
}

// element[i] -> gain[i] -> master -> analyser -> destination
fn build_routing(
    audio_ctx: web::AudioContext,
    elements: &[web::HtmlAudioElement],
    config: &AudioConfig,
) -> Result<Routing, ()> {
    let master_gain = create_gain(&audio_ctx, 1.0, "Master")?;
    let analyser = web::AnalyserNode::new(&audio_ctx)
        .map_err(|e| log::error!("AnalyserNode error: {:?}", e))?;
    analyser.set_fft_size(config.fft_size);
    analyser.set_smoothing_time_constant(config.smoothing);
    let _ = master_gain.connect_with_audio_node(&analyser);
    let _ = analyser.connect_with_audio_node(&audio_ctx.destination());

    let mut channel_gains = Vec::with_capacity(elements.len());
    let mut sources = Vec::with_capacity(elements.len());
    for (i, el) in elements.iter().enumerate() {
        let source = audio_ctx
            .create_media_element_source(el)
            .map_err(|e| log::error!("channel {} MediaElementSource error: {:?}", i, e))?;
        let gain = create_gain(&audio_ctx, 0.0, "Channel")?;
        let _ = source.connect_with_audio_node(&gain);
        let _ = gain.connect_with_audio_node(&master_gain);
        channel_gains.push(gain);
        sources.push(source);
    }

    Ok(Routing {
        audio_ctx,
        channel_gains,
        master_gain,
        analyser,
        _sources: sources,
    })
}

fn describe(e: &JsValue) -> String {
    match e.dyn_ref::<web::DomException>() {
        Some(ex) => format!("{}: {}", ex.name(), ex.message()),
        None => format!("{:?}", e),
    }
}

fn classify_play_error(e: &JsValue) -> AudioError {
    match e.dyn_ref::<web::DomException>() {
        Some(ex) if ex.name() == "NotAllowedError" => AudioError::AutoplayBlocked(ex.message()),
        _ => AudioError::Failed(describe(e)),
    }
}

fn settled(result: Result<(), AudioError>) -> PendingResult {
    Box::pin(std::future::ready(result))
}

impl AudioBackend for WebAudioBackend {
    fn open(&mut self) -> Result<GraphMode, AudioError> {
        self.elements = create_elements()?;
        self.probe = web::HtmlAudioElement::new().ok();

        let audio_ctx = match web::AudioContext::new() {
            Ok(c) => c,
            Err(e) => {
                log::warn!("AudioContext unavailable, using element volume: {:?}", e);
                return Ok(GraphMode::ElementOnly);
            }
        };
        match build_routing(audio_ctx.clone(), &self.elements, &self.config) {
            Ok(routing) => {
                self.routing = Some(routing);
                Ok(GraphMode::Connected)
            }
            Err(()) => {
                // a half-built graph may have captured an element's output;
                // start over with fresh elements outside any context
                let _ = audio_ctx.close();
                self.elements = create_elements()?;
                Ok(GraphMode::ElementOnly)
            }
        }
    }

    fn close(&mut self) {
        for el in &self.elements {
            let _ = el.pause();
            let _ = el.remove_attribute("src");
        }
        if let Some(r) = self.routing.take() {
            let _ = r.audio_ctx.close();
        }
        self.elements.clear();
        self.probe = None;
    }

    fn is_suspended(&self) -> bool {
        self.routing
            .as_ref()
            .map_or(false, |r| r.audio_ctx.state() == web::AudioContextState::Suspended)
    }

    fn resume(&mut self) -> PendingResult {
        let Some(r) = &self.routing else {
            return settled(Ok(()));
        };
        match r.audio_ctx.resume() {
            Ok(promise) => {
                let fut = JsFuture::from(promise);
                Box::pin(async move {
                    fut.await
                        .map(|_| ())
                        .map_err(|e| AudioError::ResumeRejected(describe(&e)))
                })
            }
            Err(e) => settled(Err(AudioError::ResumeRejected(describe(&e)))),
        }
    }

    fn now(&self) -> f64 {
        match &self.routing {
            Some(r) => r.audio_ctx.current_time(),
            None => instant::now() / 1000.0,
        }
    }

    fn can_play(&self, source: &MediaSource) -> bool {
        let ty = source.probe_type();
        if ty.is_empty() {
            return true;
        }
        match &self.probe {
            Some(probe) => !probe.can_play_type(&ty).is_empty(),
            None => true,
        }
    }

    fn load(&mut self, channel: usize, url: &str, looping: bool) {
        if let Some(el) = self.element(channel) {
            el.set_src(url);
            el.set_loop(looping);
        }
    }

    fn unload(&mut self, channel: usize) {
        if let Some(el) = self.element(channel) {
            let _ = el.pause();
            let _ = el.remove_attribute("src");
            el.load();
        }
    }

    fn play(&mut self, channel: usize) -> PendingResult {
        let Some(el) = self.element(channel) else {
            return settled(Err(AudioError::Failed(format!("no element {}", channel))));
        };
        match el.play() {
            Ok(promise) => {
                let fut = JsFuture::from(promise);
                Box::pin(async move { fut.await.map(|_| ()).map_err(|e| classify_play_error(&e)) })
            }
            Err(e) => settled(Err(classify_play_error(&e))),
        }
    }

    fn pause(&mut self, channel: usize) {
        if let Some(el) = self.element(channel) {
            let _ = el.pause();
        }
    }

    fn set_channel_gain(&mut self, channel: usize, value: f32) {
        let now = self.now();
        if let Some(g) = self.channel_gain(channel) {
            let _ = g.gain().cancel_scheduled_values(now);
            g.gain().set_value(value);
        } else if let Some(el) = self.element(channel) {
            el.set_volume(value.clamp(0.0, 1.0) as f64);
        }
    }

    fn ramp_channel_gain(&mut self, channel: usize, ramp: &Ramp) {
        if let Some(g) = self.channel_gain(channel) {
            let param = g.gain();
            let _ = param.cancel_scheduled_values(ramp.start);
            let _ = param.set_value_at_time(ramp.from, ramp.start);
            let _ = param.linear_ramp_to_value_at_time(ramp.to, ramp.end());
        }
    }

    fn hold_channel_gain(&mut self, channel: usize, at: f64, value: f32) {
        if let Some(g) = self.channel_gain(channel) {
            let param = g.gain();
            let _ = param.cancel_scheduled_values(at);
            let _ = param.set_value_at_time(value, at);
        }
    }

    fn set_master_gain(&mut self, value: f32) {
        if let Some(r) = &self.routing {
            r.master_gain.gain().set_value(value);
        }
    }

    fn frequency_bin_count(&self) -> usize {
        self.routing
            .as_ref()
            .map_or(0, |r| r.analyser.frequency_bin_count() as usize)
    }

    fn read_frequency_data(&mut self, out: &mut [f32]) -> bool {
        match &self.routing {
            Some(r) => {
                r.analyser.get_float_frequency_data(out);
                true
            }
            None => false,
        }
    }
}
