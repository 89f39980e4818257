// src/main.rs
//
// Drives a running dayoff-core server through a supervisor's save/list cycle and
// one check-in. Usage: dayoff-test-client [BASE_URL] [SUPERVISOR_BADGE] [EMPLOYEE_BADGE]

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::error::Error;

const BADGE_HEADER: &str = "x-employee-badge";

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SupervisorStatus {
    is_supervisor: bool,
    subordinates: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeSchedule {
    badge: String,
    name: String,
    work_days: Vec<String>,
    off_days: Vec<String>,
    has_any_dispatch: bool,
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleListing {
    period: Vec<String>,
    max_off_days: usize,
    employees: Vec<EmployeeSchedule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveEntry {
    badge: String,
    work_days: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveReport {
    success: bool,
    dispatches_created: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DispatchView {
    token: String,
    date: String,
    window: String,
    status: String,
    dispatch_at: String,
    expires_at: String,
}

fn badge_headers(badge: &str) -> Result<header::HeaderMap, Box<dyn Error>> {
    let mut headers = header::HeaderMap::new();
    headers.insert(BADGE_HEADER, header::HeaderValue::from_str(badge)?);
    Ok(headers)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| "http://localhost:3000".to_string());
    let supervisor = args.next().unwrap_or_else(|| "9001".to_string());
    let employee = args.next().unwrap_or_else(|| "1001".to_string());
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health);

    // Test 2: Identity is required
    println!("\n🔍 Listing without an identity header...");
    let anonymous = client
        .get(format!("{}/api/schedule", base_url))
        .send()
        .await?;
    println!("Anonymous listing status (expect 401): {}", anonymous.status());

    // Test 3: Supervisor status
    println!("\n🔍 Checking supervisor status of {}...", supervisor);
    let status_response = client
        .get(format!("{}/api/supervisor/status", base_url))
        .headers(badge_headers(&supervisor)?)
        .send()
        .await?;
    if !status_response.status().is_success() {
        println!("Supervisor status failed: {}", status_response.text().await?);
        return Ok(());
    }
    let status = status_response.json::<SupervisorStatus>().await?;
    println!("Supervisor status: {:?}", status);
    if !status.is_supervisor {
        println!("⚠️ Badge {} is not a supervisor; import a roster first.", supervisor);
        return Ok(());
    }

    // Test 4: Current listing
    println!("\n🔍 Listing the team schedule...");
    let listing = client
        .get(format!("{}/api/schedule", base_url))
        .headers(badge_headers(&supervisor)?)
        .send()
        .await?
        .json::<ScheduleListing>()
        .await?;
    println!(
        "Period {:?} (max {} off days), {} employee(s)",
        listing.period,
        listing.max_off_days,
        listing.employees.len()
    );
    for schedule in &listing.employees {
        println!(
            "  {} {:<20} {:<18} work={:?} off={:?} dispatched={}",
            schedule.badge,
            schedule.name,
            schedule.label,
            schedule.work_days,
            schedule.off_days,
            schedule.has_any_dispatch
        );
    }

    // Test 5: Save the first half of the period as work days
    let half = listing.period.len() / 2;
    let entry = SaveEntry {
        badge: employee.clone(),
        work_days: listing.period[..half].to_vec(),
    };
    println!("\n🔍 Saving {:?}...", entry);
    let save_response = client
        .post(format!("{}/api/schedule", base_url))
        .headers(badge_headers(&supervisor)?)
        .json(&json!({ "entries": [entry] }))
        .send()
        .await?;
    println!("Save response status: {}", save_response.status());
    let report = save_response.json::<SaveReport>().await?;
    println!(
        "Save success={}, dispatches created={}",
        report.success, report.dispatches_created
    );

    // Test 6: Employee view of their own days
    println!("\n🔍 Reading the schedule of {}...", employee);
    let mine = client
        .get(format!("{}/api/schedule/me", base_url))
        .headers(badge_headers(&employee)?)
        .send()
        .await?;
    println!("Own schedule status: {}", mine.status());
    println!("Own schedule body: {}", mine.text().await?);

    // Test 7: Check-in flow, driven by a token typed in from the dispatch message
    let token = prompt_for_token()?;
    if !token.is_empty() {
        println!("\n🔍 Looking up dispatch {}...", token);
        let lookup = client
            .get(format!("{}/api/dispatches/{}", base_url, token))
            .headers(badge_headers(&employee)?)
            .send()
            .await?;
        if lookup.status().is_success() {
            let view = lookup.json::<DispatchView>().await?;
            println!(
                "Dispatch {} on {} ({}) sent at {} is {}, expires at {}",
                view.token, view.date, view.window, view.dispatch_at, view.status, view.expires_at
            );
        } else {
            println!("Lookup failed: {}", lookup.text().await?);
        }

        let validate = client
            .post(format!("{}/api/dispatches/{}/validate", base_url, token))
            .headers(badge_headers(&employee)?)
            .send()
            .await?;
        println!("Validation response status: {}", validate.status());
        println!("Validation body: {}", validate.text().await?);
    }

    println!("\n✅ Testing complete!");

    Ok(())
}

fn prompt_for_token() -> Result<String, Box<dyn Error>> {
    println!("Enter a dispatch token (press Enter to skip the check-in test):");
    let mut token = String::new();
    std::io::stdin().read_line(&mut token)?;
    Ok(token.trim().to_string())
}
