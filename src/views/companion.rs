use std::time::Instant;

use iced::widget::text::Shaping;
use iced::widget::{column, container, mouse_area, row, scrollable, space, text, text_input};
use iced::{mouse, Alignment, Element, Length};

use crate::chat::Role;
use crate::lifecycle::BackendStatus;
use crate::renderer::{
    Renderer, RendererMessage, BUBBLE_PADDING, BUBBLE_WIDTH_RATIO, FOOTER_HEIGHT, HEADER_HEIGHT,
    INPUT_HEIGHT, ITEM_SPACING, PANEL_PADDING,
};
use crate::theme::ThemeColors;

impl Renderer {
    pub(crate) fn view<'a>(
        &'a self,
        colors: ThemeColors,
        status: &BackendStatus,
        width: u32,
        now: Instant,
    ) -> Element<'a, RendererMessage> {
        let shaped = Shaping::Advanced;
        let bubble_width = (width.saturating_sub(2 * PANEL_PADDING) as f32) * BUBBLE_WIDTH_RATIO;

        // --- Header: status dot, name, away badge, close ---
        let dot_color = match status {
            BackendStatus::Online => colors.online,
            BackendStatus::Starting => colors.starting,
            BackendStatus::Offline(_) => colors.offline,
        };
        let mut header = row![
            text("●").size(colors.body_text).color(dot_color).shaping(shaped),
            text("Rin").size(colors.title_text).color(colors.text),
        ]
        .spacing(6)
        .align_y(Alignment::Center)
        .height(HEADER_HEIGHT as f32);

        if self.is_away() {
            header = header.push(text("away").size(colors.info_text).color(colors.muted));
        }
        if let BackendStatus::Offline(reason) = status {
            header = header.push(
                text(crate::util::truncate_str(reason, 40))
                    .size(colors.info_text)
                    .color(colors.muted),
            );
        }
        header = header.push(space::horizontal()).push(
            mouse_area(text("✕").size(colors.title_text).color(colors.muted).shaping(shaped))
                .on_press(RendererMessage::QuitPressed)
                .interaction(mouse::Interaction::Pointer),
        );

        let mut body = column![header].spacing(ITEM_SPACING as f32);

        // --- Reaction bubble ---
        if let Some(reaction) = self.reactions.active(now) {
            body = body.push(
                container(
                    text(reaction.description.as_str())
                        .size(colors.title_text)
                        .color(colors.text)
                        .shaping(shaped),
                )
                .padding(BUBBLE_PADDING as u16 + 2)
                .width(Length::Fill)
                .style(colors.reaction_style()),
            );
        }

        // --- Chat log ---
        let mut log = column![].spacing(ITEM_SPACING as f32).width(Length::Fill);
        for message in self.chat.messages() {
            let bubble = container(
                text(message.content.as_str())
                    .size(colors.body_text)
                    .shaping(shaped),
            )
            .padding(BUBBLE_PADDING as u16)
            .max_width(bubble_width)
            .style(colors.bubble_style(message.role));

            let line: Element<'a, RendererMessage> = match message.role {
                Role::User => row![space::horizontal(), bubble].into(),
                Role::Model | Role::Error => row![bubble, space::horizontal()].into(),
            };
            log = log.push(line);
        }
        if self.chat.is_pending() {
            log = log.push(
                text(self.spinner.glyph())
                    .size(colors.title_text)
                    .color(colors.accent)
                    .shaping(shaped),
            );
        }
        body = body.push(
            scrollable(log)
                .anchor_bottom()
                .height(Length::Fill)
                .width(Length::Fill),
        );

        // --- Input ---
        let placeholder = if self.chat.is_pending() {
            "Rin is typing..."
        } else {
            "Say something..."
        };
        body = body.push(
            container(
                text_input(placeholder, &self.input)
                    .on_input(RendererMessage::InputChanged)
                    .on_submit(RendererMessage::Submit)
                    .size(colors.body_text)
                    .padding(8)
                    .style(colors.input_style()),
            )
            .height(INPUT_HEIGHT as f32),
        );

        body = body.push(
            container(
                text(format!(
                    "rin-hud v{} ({})",
                    env!("RIN_HUD_VERSION"),
                    env!("RIN_HUD_COMMIT")
                ))
                .size(colors.info_text)
                .color(colors.muted),
            )
            .height(FOOTER_HEIGHT as f32),
        );

        container(body)
            .padding(PANEL_PADDING as u16)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(colors.panel_style())
            .into()
    }
}
