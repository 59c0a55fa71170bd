use crate::{
    config::AppConfig,
    gateway::{
        CachedGateway,
        GameGateway,
        GraphqlGateway,
    },
    progress::LevelUpRule,
    session::{
        SessionController,
        SessionEvent,
    },
    ui,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{
    info,
    warn,
};

pub async fn run_app(config: AppConfig) -> Result<()> {
    let transport = GraphqlGateway::new(&config.endpoint, config.request_timeout)?;
    info!(endpoint = %transport, "using GraphQL endpoint");
    if config.level_rule == LevelUpRule::LegacyUnitProbe {
        warn!("legacy level-up rule selected: the bar rests at 100 and levels every 11th tap");
    }
    let gateway = Arc::new(CachedGateway::new(transport));
    let (controller, events) =
        SessionController::new(gateway, config.identity(), config.level_rule);

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, events, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    tracing::info!("UI closed");
    res
}

enum LoopControl {
    Continue,
    Quit,
}

async fn run_loop<G: GameGateway>(
    mut controller: SessionController<G>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    tracing::info!("Running app loop");
    ui::draw(ui_state, &controller.snapshot()).wrap_err("draw loading screen failed")?;

    if let LoopControl::Quit = wait_for_initialize(&mut controller, input_events).await? {
        return Ok(());
    }
    ui::draw(ui_state, &controller.snapshot()).wrap_err("draw after load failed")?;

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    warn!("session event channel closed");
                    break;
                };
                controller.handle_event(event);
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after session event failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Tap(at) => {
                        controller.on_tap(at);
                    }
                    ui::UserEvent::Redraw => {}
                }
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}

/// Drives the initial lookup while still honouring quit requests.
async fn wait_for_initialize<G: GameGateway>(
    controller: &mut SessionController<G>,
    input_events: &mut ui::InputEventReceiver,
) -> Result<LoopControl> {
    let quit_only = ui::UiState::default();
    let init = controller.initialize();
    tokio::pin!(init);
    loop {
        tokio::select! {
            _ = &mut init => return Ok(LoopControl::Continue),
            _ = tokio::signal::ctrl_c() => return Ok(LoopControl::Quit),
            raw_ev = ui::next_raw_event(input_events) => {
                if let Some(ui::UserEvent::Quit) = ui::interpret_event(&quit_only, raw_ev?) {
                    return Ok(LoopControl::Quit);
                }
            }
        }
    }
}
