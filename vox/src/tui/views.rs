//! Console views and rendering

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};

use crate::domain::{AgentStatus, MessageRole, PlanStepStatus, TaskStatus, ToolStatus};
use crate::orchestrator::NoticeLevel;

use super::state::{AppState, Panel};

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Panels
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20), // Agent roster
            Constraint::Percentage(45), // Command stream
            Constraint::Percentage(35), // Tasks + artifact
        ])
        .split(chunks[0]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);

    render_agents(state, frame, left[0]);
    render_tools(state, frame, left[1]);
    render_stream(state, frame, columns[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),         // Tasks
            Constraint::Length(3),      // Sprint gauge
            Constraint::Percentage(35), // Artifact viewer
        ])
        .split(columns[2]);

    render_tasks(state, frame, right[0]);
    render_gauge(state, frame, right[1]);
    render_artifact(state, frame, right[2]);

    render_input(state, frame, chunks[1]);
    render_status_line(state, frame, chunks[2]);
}

fn agent_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Active | AgentStatus::Working => Color::Green,
        AgentStatus::Idle => Color::DarkGray,
        AgentStatus::Error => Color::Red,
    }
}

fn render_agents(state: &AppState, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = state
        .agents
        .iter()
        .map(|agent| {
            let avatar = agent.avatar.as_deref().unwrap_or("·");
            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(format!("{avatar} ")),
                    Span::styled(&agent.name, Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" "),
                    Span::styled(
                        agent.status.to_string(),
                        Style::default().fg(agent_color(agent.status)),
                    ),
                ]),
                Line::from(vec![
                    Span::styled(format!("  {}", agent.role), Style::default().fg(Color::DarkGray)),
                    Span::styled(
                        format!("  {} tok", agent.tokens_used),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
            ])
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Agents "));
    frame.render_widget(list, area);
}

fn step_glyph(status: PlanStepStatus) -> &'static str {
    match status {
        PlanStepStatus::Completed => "✔",
        PlanStepStatus::InProgress => "◐",
        PlanStepStatus::Pending => "○",
    }
}

fn role_prefix(role: MessageRole) -> Span<'static> {
    match role {
        MessageRole::User => Span::styled("you ▸ ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        MessageRole::Orchestrator => {
            Span::styled("vox ▸ ", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        }
        MessageRole::System => Span::styled("sys ▸ ", Style::default().fg(Color::DarkGray)),
        MessageRole::Agent => Span::styled("agt ▸ ", Style::default().fg(Color::Green)),
    }
}

fn render_stream(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for message in &state.messages {
        let mut first = true;
        for text in message.content.lines() {
            if first {
                lines.push(Line::from(vec![role_prefix(message.role), Span::raw(text.to_string())]));
                first = false;
            } else {
                lines.push(Line::from(format!("      {text}")));
            }
        }
        if first {
            lines.push(Line::from(vec![role_prefix(message.role)]));
        }

        // The plan stepper renders under its owning message
        let mut steps: Vec<_> = state
            .plan_steps
            .iter()
            .filter(|s| s.message_id == message.id)
            .collect();
        steps.sort_by_key(|s| s.order_index);
        for step in steps {
            let agent = step
                .agent_id
                .as_ref()
                .and_then(|id| state.agents.iter().find(|a| a.id == *id))
                .map(|a| format!(" @{}", a.name))
                .unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(format!("   {} ", step_glyph(step.status)), Style::default().fg(Color::Yellow)),
                Span::raw(step.label.clone()),
                Span::styled(agent, Style::default().fg(Color::Green)),
            ]));
        }
        lines.push(Line::from(""));
    }

    if state.streaming {
        let mut first = true;
        for text in state.stream_content.lines() {
            if first {
                lines.push(Line::from(vec![
                    role_prefix(MessageRole::Orchestrator),
                    Span::raw(text.to_string()),
                ]));
                first = false;
            } else {
                lines.push(Line::from(format!("      {text}")));
            }
        }
        for (i, step) in state.stream_plan.iter().enumerate() {
            let agent = step.agent.as_deref().map(|a| format!(" @{a}")).unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(format!("   {} ", step_glyph(step.status)), Style::default().fg(Color::Yellow)),
                Span::raw(format!("{}. {}", i + 1, step.label)),
                Span::styled(agent, Style::default().fg(Color::Green)),
            ]));
        }
        lines.push(Line::from(Span::styled("▌", Style::default().fg(Color::Magenta))));
    }

    // Keep the tail visible
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;

    let stream = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Command Stream "))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(stream, area);
}

fn task_glyph(status: TaskStatus) -> (&'static str, Color) {
    match status {
        TaskStatus::Pending => ("○", Color::Yellow),
        TaskStatus::InProgress => ("◐", Color::Cyan),
        TaskStatus::Completed => ("✔", Color::Green),
        TaskStatus::Blocked => ("⊘", Color::Red),
    }
}

fn render_tasks(state: &AppState, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = state
        .tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let (glyph, color) = task_glyph(task.status);
            let content = Line::from(vec![
                Span::styled(format!("{glyph} "), Style::default().fg(color)),
                Span::raw(task.title.clone()),
                Span::styled(
                    format!(" [{}]", task.assignee),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            if state.focus == Panel::Tasks && i == state.selected_task {
                ListItem::new(content).style(Style::default().bg(Color::DarkGray).fg(Color::White))
            } else {
                ListItem::new(content)
            }
        })
        .collect();

    let title = if state.focus == Panel::Tasks {
        " Tasks ● "
    } else {
        " Tasks "
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn render_gauge(state: &AppState, frame: &mut Frame, area: Rect) {
    let (done, total) = state.task_progress();
    let ratio = if total == 0 { 0.0 } else { done as f64 / total as f64 };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Sprint "))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{done}/{total}"));
    frame.render_widget(gauge, area);
}

fn render_artifact(state: &AppState, frame: &mut Frame, area: Rect) {
    let (title, body) = match state.current_artifact() {
        Some(artifact) => (
            format!(" {} v{} ({}) ", artifact.title, artifact.version, artifact.content_type),
            artifact.content.clone(),
        ),
        None => (" Artifact ".to_string(), "No artifacts yet".to_string()),
    };

    let viewer = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(viewer, area);
}

fn render_input(state: &AppState, frame: &mut Frame, area: Rect) {
    let title = if state.streaming {
        " Input (streaming…) "
    } else if state.focus == Panel::Input {
        " Input ● "
    } else {
        " Input "
    };
    let input = Paragraph::new(state.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(input, area);

    if state.focus == Panel::Input {
        frame.set_cursor_position((area.x + 1 + state.input.chars().count() as u16, area.y + 1));
    }
}

fn render_status_line(state: &AppState, frame: &mut Frame, area: Rect) {
    let line = match &state.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Blue,
                NoticeLevel::Warning => Color::Yellow,
                NoticeLevel::Error => Color::Red,
            };
            Line::from(vec![
                Span::styled(
                    format!(" {} ", notice.title),
                    Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(notice.body.clone(), Style::default().fg(color)),
            ])
        }
        None => Line::from(vec![
            Span::styled(" Tab", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" focus "),
            Span::styled(" Enter", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" send "),
            Span::styled(" d", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" done "),
            Span::styled(" a", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" reassign "),
            Span::styled(" Space", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" toggle tool "),
            Span::styled(" Ctrl+C", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]),
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn tool_glyph(status: ToolStatus, enabled: bool) -> (&'static str, Color) {
    if !enabled {
        return ("▢", Color::DarkGray);
    }
    match status {
        ToolStatus::Ready => ("▣", Color::Green),
        ToolStatus::Executing => ("◈", Color::Cyan),
        ToolStatus::Error => ("▲", Color::Red),
    }
}

fn render_tools(state: &AppState, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = state
        .tools
        .iter()
        .enumerate()
        .map(|(i, tool)| {
            let (glyph, color) = tool_glyph(tool.status, tool.is_enabled);
            let cred = if tool.requires_credential { " 🔑" } else { "" };
            let content = Line::from(vec![
                Span::styled(format!("{glyph} "), Style::default().fg(color)),
                Span::raw(tool.name.clone()),
                Span::styled(format!(" ({}){cred}", tool.category), Style::default().fg(Color::DarkGray)),
            ]);
            if state.focus == Panel::Tools && i == state.selected_tool {
                ListItem::new(content).style(Style::default().bg(Color::DarkGray).fg(Color::White))
            } else {
                ListItem::new(content)
            }
        })
        .collect();

    let title = if state.focus == Panel::Tools {
        " Tools ● "
    } else {
        " Tools "
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Notice, SessionEvent};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered_text(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(state, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_stream_shows_live_content_while_streaming() {
        let mut state = AppState::new("conv-1");
        state.streaming = true;
        state.apply_session_event(SessionEvent::Delta("working on it".to_string()));
        assert!(rendered_text(&state).contains("working on it"));
    }

    #[test]
    fn test_failed_session_stays_visible_in_the_stream() {
        let mut state = AppState::new("conv-1");
        state.streaming = true;
        state.apply_session_event(SessionEvent::Delta("Partial answer".to_string()));
        state.apply_session_event(SessionEvent::Failed {
            notice: Notice::warning("Rate Limited", "slow down"),
            content: "The orchestrator is rate limited.".to_string(),
        });

        let text = rendered_text(&state);
        assert!(text.contains("Partial answer"), "partial content is not rolled back");
        assert!(
            text.contains("The orchestrator is rate limited."),
            "the substituted reply renders in the stream"
        );
    }
}
