use crate::app::{App, Message};
use crate::serial::BaudRate;
use crate::timer;
use iced::widget::{button, column, container, pick_list, row, scrollable, text};
use iced::{Element, Length};

pub fn log_id() -> scrollable::Id {
    scrollable::Id::new("received-lines")
}

pub fn view(app: &App) -> Element<Message> {
    let connected = app.is_connected();

    let port_selection = row![
        text("Serial Port:").width(Length::Fixed(90.0)),
        pick_list(
            &app.available_ports[..],
            app.selected_port.as_ref(),
            Message::PortSelected,
        )
        .placeholder("No ports found")
        .width(Length::Fill),
        button("Refresh").on_press(Message::RefreshPorts),
    ]
    .spacing(10);

    let baud_selection = row![
        text("Baud Rate:").width(Length::Fixed(90.0)),
        pick_list(BaudRate::ALL, Some(app.baud_rate), Message::BaudRateSelected)
            .width(Length::Fill),
    ]
    .spacing(10);

    let connection_controls = row![
        button(if connected { "Disconnect" } else { "Connect" })
            .on_press(Message::ToggleConnection),
        button("Reconnect").on_press_maybe(connected.then_some(Message::Reconnect)),
    ]
    .spacing(10);

    let received = scrollable(
        column(
            app.log
                .iter()
                .map(|line| text(line).size(12).into())
                .collect::<Vec<_>>(),
        )
        .spacing(2)
        .padding(10),
    )
    .id(log_id())
    .width(Length::Fill)
    .height(Length::Fill);

    let timing = row![
        button("Pause").on_press_maybe(app.can_pause().then_some(Message::Pause)),
        text(timer::status_line(&app.latency)).size(16),
    ]
    .spacing(10);

    container(
        column![
            port_selection,
            baud_selection,
            connection_controls,
            container(received).height(Length::Fill),
            timing,
        ]
        .spacing(10)
        .padding(10),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .into()
}
