use crate::model::Scene;
use crate::sim::PlayerAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press {
                out.push(InputEvent { key: k.code });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, ev: &InputEvent) -> Option<PlayerAction> {
    // Global
    match ev.key {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(PlayerAction::Quit),
        KeyCode::Char('?') => return Some(PlayerAction::HelpToggle),
        KeyCode::Esc => return Some(PlayerAction::Back),
        _ => {}
    }

    match scene {
        Scene::Main => match ev.key {
            KeyCode::Char('f') | KeyCode::Char('F') => Some(PlayerAction::Feed),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(PlayerAction::Play),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(PlayerAction::Clean),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(PlayerAction::Sleep),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(PlayerAction::Heal),
            _ => None,
        },
        Scene::Help => None,
    }
}
