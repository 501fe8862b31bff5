use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};
use std::io;

use crate::lib::aggregator::Recommendation;

/// Show the ranked recommendations in a scrollable table.
pub fn display_recommendations_table(recommendations: &[Recommendation]) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, recommendations);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    recommendations: &[Recommendation],
) -> io::Result<()> {
    let mut state = TableState::default();
    state.select(Some(0));

    loop {
        terminal.draw(|f| {
            let area = f.area();

            let header_cells = [
                "Resource",
                "Type",
                "Action",
                "Priority",
                "Avg CPU %",
                "Savings ($/mo)",
                "Reason",
            ]
            .iter()
            .map(|h| {
                Cell::from(*h).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            });
            let header = Row::new(header_cells)
                .style(Style::default().bg(Color::DarkGray))
                .height(1);

            let rows = recommendations.iter().map(|rec| {
                let cells = vec![
                    Cell::from(rec.resource_id.clone()),
                    Cell::from(rec.type_class.clone()),
                    Cell::from(rec.action.to_string()),
                    Cell::from(rec.priority.to_string()),
                    Cell::from(format!("{:.1}", rec.metric_value)),
                    Cell::from(format!("{:.2}", rec.savings)),
                    Cell::from(rec.reason.clone()),
                ];
                Row::new(cells).height(1)
            });

            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(14),
                    Constraint::Percentage(10),
                    Constraint::Percentage(14),
                    Constraint::Percentage(8),
                    Constraint::Percentage(9),
                    Constraint::Percentage(12),
                    Constraint::Percentage(33),
                ],
            )
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Cost Optimization Recommendations (Press 'q' to quit) "),
            )
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");

            f.render_stateful_widget(table, area, &mut state);
        })?;

        // Handle input
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => {
                        let i = match state.selected() {
                            Some(i) => {
                                if i + 1 >= recommendations.len() {
                                    0
                                } else {
                                    i + 1
                                }
                            }
                            None => 0,
                        };
                        state.select(Some(i));
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        let i = match state.selected() {
                            Some(i) => {
                                if i == 0 {
                                    recommendations.len().saturating_sub(1)
                                } else {
                                    i - 1
                                }
                            }
                            None => 0,
                        };
                        state.select(Some(i));
                    }
                    _ => {}
                }
            }
        }
    }
}
