use bevy::prelude::*;

use crate::{
    drift::{ComboTier, Emphasis, HudReadout},
    frame::DriftFeedback,
    input::InputState,
};

pub struct ScoreText;

pub struct ControlsGuide;

const FONT: &str = "fonts/fira_sans/FiraSans-Regular.ttf";
const BASE_FONT_SIZE: f32 = 48.0;

fn tier_color(tier: ComboTier) -> Color {
    match tier.emphasis() {
        Emphasis::Plain => Color::WHITE,
        Emphasis::Pulse => Color::rgb(1.0, 0.9, 0.2),
        Emphasis::Shake => Color::rgb(1.0, 0.55, 0.1),
        Emphasis::Madness => Color::rgb(1.0, 0.15, 0.15),
        Emphasis::Frenzy => Color::rgb(1.0, 0.2, 0.9),
    }
}

/// Extra rotation in degrees for the shaking tiers, `seconds` being wall-clock time.
pub fn wobble(tier: ComboTier, seconds: f32) -> f32 {
    if !tier.shakes() {
        return 0.0;
    }
    let amplitude = 3.0 * f32::from(tier.rank() - 2);
    (seconds * 40.0).sin() * amplitude
}

pub fn setup_hud(mut commands: Commands, asset_server: Res<AssetServer>) {
    let font = asset_server.load(FONT);

    commands.spawn_bundle(UiCameraBundle::default());

    let section = |value: &str, font_size: f32| TextSection {
        value: value.to_string(),
        style: TextStyle {
            font: font.clone(),
            font_size,
            color: Color::WHITE,
        },
    };

    let mut score = TextBundle {
        style: Style {
            position_type: PositionType::Absolute,
            position: Rect {
                top: Val::Percent(20.0),
                left: Val::Percent(42.0),
                ..Default::default()
            },
            ..Default::default()
        },
        text: Text {
            sections: vec![section("", BASE_FONT_SIZE), section("", BASE_FONT_SIZE * 0.75)],
            alignment: TextAlignment {
                horizontal: HorizontalAlign::Center,
                ..Default::default()
            },
        },
        ..Default::default()
    };
    score.visible.is_visible = false;
    commands.spawn_bundle(score).insert(ScoreText);

    commands
        .spawn_bundle(TextBundle {
            style: Style {
                position_type: PositionType::Absolute,
                position: Rect {
                    bottom: Val::Px(15.0),
                    left: Val::Px(15.0),
                    ..Default::default()
                },
                ..Default::default()
            },
            text: Text::with_section(
                "W accelerate  S brake/reverse  A/D steer  SPACE handbrake  ESC quit",
                TextStyle {
                    font,
                    font_size: 16.0,
                    color: Color::WHITE,
                },
                TextAlignment {
                    horizontal: HorizontalAlign::Left,
                    ..Default::default()
                },
            ),
            ..Default::default()
        })
        .insert(ControlsGuide);
}

pub fn update_score(
    time: Res<Time>,
    mut feedback: EventReader<DriftFeedback>,
    mut text: Query<(&mut Text, &mut Visible, &mut Transform), With<ScoreText>>,
) {
    let latest = match feedback.iter().last() {
        Some(latest) => *latest,
        None => return,
    };

    let (mut text, mut visible, mut transform) = match text.single_mut() {
        Ok(text) => text,
        Err(_) => return,
    };

    visible.is_visible = latest.active;
    if !latest.active {
        return;
    }

    let HudReadout {
        tier,
        label,
        score,
        scale,
        tilt_degrees,
    } = latest.readout();

    let color = tier_color(tier);
    text.sections[0].value = format!("{}\n", label);
    text.sections[0].style.color = color;
    text.sections[1].value = score.to_string();
    text.sections[1].style.color = color;

    let tilt = tilt_degrees + wobble(tier, time.seconds_since_startup() as f32);
    transform.rotation = Quat::from_rotation_z(tilt.to_radians());
    transform.scale = Vec3::splat(scale);
}

pub fn hide_controls_guide(
    input: Res<InputState>,
    mut guide: Query<&mut Visible, With<ControlsGuide>>,
) {
    if !input.engaged() {
        return;
    }

    for mut visible in guide.iter_mut() {
        visible.is_visible = false;
    }
}
