//! Line-oriented settings surface on stdin.

use std::{
    io::{self, BufRead},
    sync::Arc,
    thread,
};

use crossbeam::channel::Sender;
use landmark_overlay_core::{
    render::KeyCommand, Catalog, Channel, ColorTarget, ConfigUpdate, ConnectionTopology, Emotion,
    Experiment, OverlayError, Result, Rgb, SettingsController,
};

const HELP: &str = "\
commands:
  set <field> <value>         dot-size, line-thickness, hexagon-radius, camera-opacity,
                              audio-sensitivity, show-camera, show-hands, performance-mode,
                              show-fps, topology, dot-color, line-color, bg-color
  set <color> <r|g|b> <0-255> change one channel of dot-color, line-color or bg-color
  set experiment <name> <on|off>
  set emotion-color <emotion> <r> <g> <b>
  mode [index]                show or select the draw mode
  save|load <name>            named configurations
  preset save|apply <name>    color presets
  list <saves|presets|autosave>
  delete <catalog> <name>
  show                        print the live configuration
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Update(ConfigUpdate),
    Mode(Option<usize>),
    Save(String),
    Load(String),
    PresetSave(String),
    PresetApply(String),
    List(Catalog),
    Delete(Catalog, String),
    Show,
    Help,
    Quit,
}

/// Starts reading commands from stdin on a detached thread. The thread ends
/// with stdin, a `quit` command, or the first line read after the controller
/// is closed.
pub fn spawn(controller: Arc<SettingsController>, keys: Sender<KeyCommand>) -> Result<()> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if controller.is_closed() {
                    break;
                }
                if let Some(notice) = controller.poll_notice() {
                    println!("mode {} of {:?}", notice.mode, notice.modes);
                }
                if line.trim().is_empty() {
                    continue;
                }
                match parse(&line) {
                    Ok(Command::Quit) => {
                        let _ = keys.send(KeyCommand::Quit);
                        break;
                    }
                    Ok(command) => {
                        if let Err(err) = execute(&controller, command) {
                            println!("error: {err}");
                        }
                    }
                    Err(err) => println!("error: {err}"),
                }
            }
            tracing::debug!("console closed");
        })?;
    Ok(())
}

pub fn execute(controller: &SettingsController, command: Command) -> Result<()> {
    if controller.is_closed() {
        return Err(OverlayError::Closed);
    }
    match command {
        Command::Update(update) => {
            controller.apply(update);
        }
        Command::Mode(Some(index)) => {
            let config = controller.apply(ConfigUpdate::Mode(index));
            println!("mode {} ({})", config.mode, config.current_mode());
        }
        Command::Mode(None) => {
            let current = controller.config().mode;
            for (index, mode) in controller.request_mode_refresh().iter().enumerate() {
                let marker = if index == current { '*' } else { ' ' };
                println!("{marker} {index}: {mode}");
            }
        }
        Command::Save(name) => controller.save(&name)?,
        Command::Load(name) => controller.load(&name)?,
        Command::PresetSave(name) => controller.save_color_preset(&name)?,
        Command::PresetApply(name) => controller.apply_color_preset(&name)?,
        Command::List(catalog) => {
            for name in controller.list(catalog)? {
                println!("{name}");
            }
        }
        Command::Delete(catalog, name) => controller.delete(catalog, &name)?,
        Command::Show => println!("{}", serde_json::to_string_pretty(&*controller.config())?),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

pub fn parse(line: &str) -> Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let rest = |from: usize| -> Result<String> {
        let name = words.get(from..).unwrap_or_default().join(" ");
        if name.is_empty() {
            Err(OverlayError::msg("missing name"))
        } else {
            Ok(name)
        }
    };

    match words.as_slice() {
        ["set", field, values @ ..] => parse_set(field, values).map(Command::Update),
        ["mode"] => Ok(Command::Mode(None)),
        ["mode", index] => Ok(Command::Mode(Some(number(index)?))),
        ["save", ..] => Ok(Command::Save(rest(1)?)),
        ["load", ..] => Ok(Command::Load(rest(1)?)),
        ["preset", "save", ..] => Ok(Command::PresetSave(rest(2)?)),
        ["preset", "apply", ..] => Ok(Command::PresetApply(rest(2)?)),
        ["list", catalog] => Ok(Command::List(catalog_named(catalog)?)),
        ["delete", catalog, ..] => Ok(Command::Delete(catalog_named(catalog)?, rest(2)?)),
        ["show"] => Ok(Command::Show),
        ["help"] => Ok(Command::Help),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        _ => Err(OverlayError::msg(format!("unrecognised command `{line}`, try `help`"))),
    }
}

fn parse_set(field: &str, values: &[&str]) -> Result<ConfigUpdate> {
    let single = || match values {
        [value] => Ok(*value),
        _ => Err(OverlayError::msg(format!("`{field}` takes one value"))),
    };

    let update = match field {
        "dot-size" => ConfigUpdate::DotSize(number(single()?)?),
        "line-thickness" => ConfigUpdate::LineThickness(number(single()?)?),
        "hexagon-radius" => ConfigUpdate::HexagonRadius(number(single()?)?),
        "camera-opacity" => ConfigUpdate::CameraOpacity(number(single()?)?),
        "audio-sensitivity" => ConfigUpdate::AudioSensitivity(number(single()?)?),
        "show-camera" => ConfigUpdate::ShowCamera(switch(single()?)?),
        "show-hands" => ConfigUpdate::ShowHands(switch(single()?)?),
        "performance-mode" => ConfigUpdate::PerformanceMode(switch(single()?)?),
        "show-fps" => ConfigUpdate::ShowFps(switch(single()?)?),
        "topology" => {
            let name = single()?;
            ConfigUpdate::Topology(
                ConnectionTopology::from_name(name)
                    .ok_or_else(|| OverlayError::msg(format!("unknown topology `{name}`")))?,
            )
        }
        "dot-color" | "line-color" | "bg-color" => {
            let target = match field {
                "dot-color" => ColorTarget::Dot,
                "line-color" => ColorTarget::Line,
                _ => ColorTarget::Background,
            };
            match values {
                [channel, value] => ConfigUpdate::ColorChannel {
                    target,
                    channel: channel_named(channel)?,
                    value: number(value)?,
                },
                _ => ConfigUpdate::Color(target, color(values)?),
            }
        }
        "experiment" => match values {
            [name, state] => ConfigUpdate::Experiment(
                Experiment::from_name(name)
                    .ok_or_else(|| OverlayError::msg(format!("unknown experiment `{name}`")))?,
                switch(state)?,
            ),
            _ => return Err(OverlayError::msg("usage: set experiment <name> <on|off>")),
        },
        "emotion-color" => match values {
            [name, channels @ ..] => ConfigUpdate::EmotionColor(
                Emotion::from_name(name)
                    .ok_or_else(|| OverlayError::msg(format!("unknown emotion `{name}`")))?,
                color(channels)?,
            ),
            _ => return Err(OverlayError::msg("usage: set emotion-color <emotion> <r> <g> <b>")),
        },
        other => return Err(OverlayError::msg(format!("unknown field `{other}`"))),
    };
    Ok(update)
}

fn number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| OverlayError::msg(format!("`{text}` is not a valid number")))
}

fn switch(text: &str) -> Result<bool> {
    match text.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(OverlayError::msg(format!("`{text}` is not on/off"))),
    }
}

fn channel_named(text: &str) -> Result<Channel> {
    Channel::from_name(text)
        .ok_or_else(|| OverlayError::msg(format!("`{text}` is not a channel (r, g or b)")))
}

/// Accepts `r g b` or `#rrggbb`.
fn color(values: &[&str]) -> Result<Rgb> {
    match values {
        [r, g, b] => Ok(Rgb(number(r)?, number(g)?, number(b)?)),
        [hex] if hex.len() == 7 && hex.starts_with('#') => {
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16)
                    .map_err(|_| OverlayError::msg(format!("`{hex}` is not a hex color")))
            };
            Ok(Rgb(channel(1..3)?, channel(3..5)?, channel(5..7)?))
        }
        _ => Err(OverlayError::msg("expected `<r> <g> <b>` or `#rrggbb`")),
    }
}

fn catalog_named(name: &str) -> Result<Catalog> {
    Catalog::from_name(name).ok_or_else(|| OverlayError::msg(format!("unknown catalog `{name}`")))
}

#[cfg(test)]
mod tests {
    use landmark_overlay_core::{
        AudioConfig, AudioEnvelopeTracker, ModeMailbox, NoAudioBackend, PersistenceStore,
        SharedConfig,
    };

    use super::*;

    #[test]
    fn parses_field_updates() {
        assert_eq!(
            parse("set dot-size 4").unwrap(),
            Command::Update(ConfigUpdate::DotSize(4))
        );
        assert_eq!(
            parse("set show-camera on").unwrap(),
            Command::Update(ConfigUpdate::ShowCamera(true))
        );
        assert_eq!(
            parse("set topology face_oval").unwrap(),
            Command::Update(ConfigUpdate::Topology(ConnectionTopology::FaceOval))
        );
        assert_eq!(
            parse("set experiment audioVisualizer off").unwrap(),
            Command::Update(ConfigUpdate::Experiment(Experiment::AudioVisualizer, false))
        );
    }

    #[test]
    fn parses_colors_and_channels() {
        assert_eq!(
            parse("set bg-color 1 2 3").unwrap(),
            Command::Update(ConfigUpdate::Color(ColorTarget::Background, Rgb(1, 2, 3)))
        );
        assert_eq!(
            parse("set line-color #ff8000").unwrap(),
            Command::Update(ConfigUpdate::Color(ColorTarget::Line, Rgb(255, 128, 0)))
        );
        assert_eq!(
            parse("set dot-color g 7").unwrap(),
            Command::Update(ConfigUpdate::ColorChannel {
                target: ColorTarget::Dot,
                channel: Channel::Green,
                value: 7
            })
        );
        assert!(parse("set dot-color x 7").is_err());
        assert!(parse("set dot-color 3 7").is_err());
        assert_eq!(
            parse("set emotion-color sad 0 0 255").unwrap(),
            Command::Update(ConfigUpdate::EmotionColor(Emotion::Sad, Rgb(0, 0, 255)))
        );
        assert!(parse("set dot-color 300 0 0").is_err());
    }

    #[test]
    fn names_may_contain_spaces() {
        assert_eq!(
            parse("save my evening look").unwrap(),
            Command::Save("my evening look".into())
        );
        assert_eq!(
            parse("delete presets Warm Glow").unwrap(),
            Command::Delete(Catalog::ColorPresets, "Warm Glow".into())
        );
        assert!(parse("save").is_err());
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse("dance").is_err());
        assert!(parse("set sparkle 3").is_err());
        assert!(parse("list everything").is_err());
        assert!(parse("mode first").is_err());
    }

    #[test]
    fn commands_after_close_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let controller = SettingsController::new(
            SharedConfig::default(),
            PersistenceStore::open(dir.path()).unwrap(),
            AudioEnvelopeTracker::new(&AudioConfig::default()),
            Box::new(NoAudioBackend),
            ModeMailbox::new(),
        );
        execute(&controller, parse("set dot-size 9").unwrap()).unwrap();
        controller.close();

        let command = parse("set experiment audioVisualizer on").unwrap();
        assert!(matches!(
            execute(&controller, command),
            Err(OverlayError::Closed)
        ));
        assert!(!controller.config().experiments.audio_visualizer);
        assert_eq!(controller.config().dot_size, 9);
        assert!(!controller.audio_running());
    }
}
