// Frame rendering. A pure function of display state and the latest snapshot.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, TableState, Tabs, Wrap,
};

use super::state::{DashboardState, View};
use crate::models::{Alert, MetricSample, Severity, Snapshot};

pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 15;

const OVERVIEW_ALERTS: usize = 5;

pub fn render(frame: &mut Frame, state: &DashboardState, snapshot: &Snapshot) {
    let area = frame.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        render_too_small(frame, area);
        return;
    }

    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_tabs(frame, header, state);
    render_footer(frame, footer, state, snapshot);

    if state.show_help {
        render_help(frame, body);
        return;
    }

    match state.current_view {
        View::Overview => render_overview(frame, body, snapshot),
        View::Processes => render_processes(frame, body, state, snapshot),
        View::Alerts => render_alerts(frame, body, snapshot),
        View::Tools => render_tools(frame, body, snapshot),
    }
}

fn render_too_small(frame: &mut Frame, area: Rect) {
    let msg = Paragraph::new(vec![
        Line::from("Terminal too small"),
        Line::from(format!("need {}x{}", MIN_WIDTH, MIN_HEIGHT)),
    ])
    .wrap(Wrap { trim: true });
    frame.render_widget(msg, area);
}

fn render_tabs(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let titles: Vec<Line> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, v)| Line::from(format!("{} {}", i + 1, v.title())))
        .collect();
    let selected = View::ALL
        .iter()
        .position(|v| *v == state.current_view)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(Block::bordered().title(" Overseer "))
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &DashboardState, snapshot: &Snapshot) {
    let mut spans = Vec::new();
    if state.paused {
        spans.push(Span::styled(
            " PAUSED ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
        spans.push(Span::raw(" "));
    }
    let arrow = if state.sort_reverse { "desc" } else { "asc" };
    spans.push(Span::raw(format!(
        "refresh {}s | sort {} {} | last update {}",
        state.refresh_rate,
        state.sort_by.label(),
        arrow,
        snapshot
            .last_update
            .map(format_clock)
            .unwrap_or_else(|| "never".into()),
    )));
    if snapshot.store_degraded {
        spans.push(Span::styled(
            " | store degraded",
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::styled(
        " | h help  q quit",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_overview(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let Some(sample) = snapshot.sample.as_ref() else {
        frame.render_widget(
            Paragraph::new("Waiting for first sample...").block(Block::bordered()),
            area,
        );
        return;
    };

    let [gauges, details, alerts] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Min(3),
    ])
    .areas(area);

    let [cpu, mem, disk] = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .areas(gauges);
    frame.render_widget(percent_gauge("CPU", sample.cpu_percent), cpu);
    frame.render_widget(percent_gauge("Memory", sample.memory_percent), mem);
    frame.render_widget(percent_gauge("Disk", sample.disk_percent), disk);

    frame.render_widget(
        Paragraph::new(detail_lines(sample)).block(Block::bordered().title(" System ")),
        details,
    );

    let items: Vec<ListItem> = snapshot
        .recent_alerts
        .iter()
        .take(OVERVIEW_ALERTS)
        .map(|a| ListItem::new(alert_line(a)))
        .collect();
    let list = if items.is_empty() {
        List::new(vec![ListItem::new("No alerts")])
    } else {
        List::new(items)
    };
    frame.render_widget(list.block(Block::bordered().title(" Recent alerts ")), alerts);
}

fn detail_lines(sample: &MetricSample) -> Vec<Line<'static>> {
    let temp = sample
        .temperature
        .map(|t| format!("{:.1}°C", t))
        .unwrap_or_else(|| "n/a".into());
    let battery = match (sample.battery_percent, sample.battery_plugged) {
        (Some(p), Some(true)) => format!("{:.0}% (plugged)", p),
        (Some(p), _) => format!("{:.0}%", p),
        (None, _) => "n/a".into(),
    };
    vec![
        Line::from(format!(
            "Memory  {:.1} / {:.1} GB",
            sample.memory_used_gb, sample.memory_total_gb
        )),
        Line::from(format!(
            "Disk    {:.1} / {:.1} GB",
            sample.disk_used_gb, sample.disk_total_gb
        )),
        Line::from(format!(
            "Network up {:.2} MB/s  down {:.2} MB/s",
            sample.network_sent_rate, sample.network_recv_rate
        )),
        Line::from(format!(
            "Load    {:.2} {:.2} {:.2}   Processes {}",
            sample.load_average[0],
            sample.load_average[1],
            sample.load_average[2],
            sample.process_count
        )),
        Line::from(format!("Temp    {}   Battery {}", temp, battery)),
    ]
}

fn percent_gauge(title: &str, value: f64) -> Gauge<'static> {
    let clamped = value.clamp(0.0, 100.0);
    let color = if clamped >= 90.0 {
        Color::Red
    } else if clamped >= 70.0 {
        Color::Yellow
    } else {
        Color::Green
    };
    Gauge::default()
        .block(Block::bordered().title(format!(" {} ", title)))
        .gauge_style(Style::default().fg(color))
        .ratio(clamped / 100.0)
        .label(format!("{:.1}%", value))
}

fn render_processes(frame: &mut Frame, area: Rect, state: &DashboardState, snapshot: &Snapshot) {
    let sorted = state.sorted_processes(&snapshot.processes);
    let header = Row::new(["PID", "NAME", "CPU%", "MEM%", "MEM MB", "STATUS"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = sorted
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.pid.to_string()),
                Cell::from(p.name.clone()),
                Cell::from(format!("{:.1}", p.cpu_percent)),
                Cell::from(format!("{:.1}", p.memory_percent)),
                Cell::from(format!("{:.0}", p.memory_mb)),
                Cell::from(p.status.clone()),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(16),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(Block::bordered().title(format!(
        " Processes ({} of {}) ",
        sorted.len(),
        snapshot.processes.len()
    )))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut table_state = TableState::default();
    table_state.select(
        state
            .selected_process
            .and_then(|pid| sorted.iter().position(|p| p.pid == pid)),
    );
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_alerts(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let header = Row::new(["TIME", "SEVERITY", "RULE", "VALUE", "THRESHOLD", "ACK"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = snapshot
        .recent_alerts
        .iter()
        .map(|a| {
            Row::new(vec![
                Cell::from(format_clock(a.timestamp)),
                Cell::from(a.severity.as_str())
                    .style(Style::default().fg(severity_color(a.severity))),
                Cell::from(a.alert_type.clone()),
                Cell::from(format!("{:.1}", a.metric_value)),
                Cell::from(format!("{:.1}", a.threshold)),
                Cell::from(match (&a.acknowledged_by, a.acknowledged) {
                    (Some(by), true) => by.clone(),
                    (None, true) => "yes".into(),
                    _ => String::new(),
                }),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Min(20),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(Block::bordered().title(format!(" Alerts ({}) ", snapshot.recent_alerts.len())));
    frame.render_widget(table, area);
}

fn render_tools(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let items: Vec<ListItem> = snapshot
        .recommendations
        .iter()
        .map(|r| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", r.category),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(r.reason.clone()),
                ]),
                Line::from(format!("    {}", r.tools.join(", "))),
            ])
        })
        .collect();
    let list = if items.is_empty() {
        List::new(vec![ListItem::new("No recommendations yet")])
    } else {
        List::new(items)
    };
    frame.render_widget(list.block(Block::bordered().title(" Suggested tools ")), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from("Tab / Shift-Tab   next / previous view"),
        Line::from("1-4               jump to view"),
        Line::from("Space             pause / resume display"),
        Line::from("c / m / n         sort by cpu / memory / name"),
        Line::from("+ / -             refresh rate"),
        Line::from("Up / Down         select process"),
        Line::from("h / ?             toggle help"),
        Line::from("q / Esc           quit"),
    ];
    let popup = centered(area, 48, lines.len() as u16 + 2);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" Help ")),
        popup,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn alert_line(alert: &Alert) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{} ", format_clock(alert.timestamp))),
        Span::styled(
            format!("{:<8} ", alert.severity.as_str()),
            Style::default().fg(severity_color(alert.severity)),
        ),
        Span::raw(alert.message.clone()),
    ])
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
    }
}

fn format_clock(ts: f64) -> String {
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|d| {
            d.with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "--:--:--".into())
}
