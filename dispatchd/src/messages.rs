//! Outbound message text. Formatting/localization proper is an external
//! concern; these builders keep the engine's replies in one place so the
//! handlers read as state transitions, not string soup.

use dispatch_types::{JobId, JobTicket, Provider, ReportedOutcome};

pub fn main_menu() -> String {
    "🔄 *Main Menu* 🛠️\n\nReply with a number:\n1️⃣ Service Call\n2️⃣ Make an Enquiry".to_string()
}

pub fn welcome() -> String {
    "Welcome! 🛠️\n\nAre you looking for a service or just asking a question?\n\
     Reply with a number:\n1️⃣ Service Call\n2️⃣ Make an Enquiry"
        .to_string()
}

pub fn empty_body_guidance() -> String {
    "We received an empty message. Reply *menu* to see what you can do.".to_string()
}

pub fn invalid_intake_choice() -> String {
    "❌ Invalid choice. Please reply with just the number *1* or *2*.".to_string()
}

pub fn category_prompt() -> String {
    "Great. What type of artisan do you need right now?\n\n\
     1️⃣ Electrical\n2️⃣ Plumbing\n3️⃣ Carpentry"
        .to_string()
}

pub fn invalid_category_choice() -> String {
    "❌ Invalid choice. Please reply with *1*, *2*, or *3*.".to_string()
}

pub fn location_prompt(category: &str) -> String {
    format!(
        "✅ You selected *{category}*.\n\n\
         Please reply with your exact location/address (e.g., Block A, Campus Hostel)."
    )
}

pub fn description_prompt() -> String {
    "📍 Location saved.\n\nFinally, please briefly describe the issue \
     (e.g., \"Sparking wall socket\" or \"Broken pipe\")."
        .to_string()
}

pub fn request_received() -> String {
    "⚙️ *Request received!* Processing your ticket...\n\
     Searching for available artisans nearby. We will notify you once a match is found."
        .to_string()
}

pub fn no_providers(support_contact: &str) -> String {
    format!(
        "⚠️ We are sorry, but there are no available artisans in that category right now. \
         Please try again later.\n\n💬 For further assistance, chat with customer service: {support_contact}"
    )
}

pub fn enquiry_prompt(support_contact: &str) -> String {
    format!(
        "Please type your enquiry below. An agent will review it shortly. \
         (Reply \"menu\" at any time to go back.)\n\n*Direct customer service: {support_contact}*"
    )
}

pub fn enquiry_received(support_contact: &str) -> String {
    format!(
        "✅ *Your enquiry has been received!*\n\nA human agent will review this shortly. \
         For immediate assistance or complaints, chat directly with customer service at: \
         *{support_contact}*\n\n(Reply \"menu\" anytime to start a new request.)"
    )
}

pub fn job_alert(ticket: &JobTicket) -> String {
    format!(
        "🚨 *FAST MATCH ALERT!* 🚨\n\n*Job ID:* #{job_id}\n*Category:* {category}\n\
         *Location:* {location}\n*Issue:* {description}\n\n\
         *(First to accept gets the client)*\nReply *ACCEPT {job_id}* to claim this job.",
        job_id = ticket.job_id,
        category = ticket.category,
        location = ticket.location,
        description = ticket.description,
    )
}

pub fn job_claimed() -> String {
    "✅ *Job Claimed!*\n\nWe are asking the client for final approval. \
     Please stand by, we will send you their contact shortly."
        .to_string()
}

pub fn invalid_job() -> String {
    "❌ Invalid Job ID.".to_string()
}

pub fn already_claimed() -> String {
    "🔒 Sorry, this job has already been claimed by another artisan or cancelled.".to_string()
}

pub fn approval_request(category: &str, profile: Option<&Provider>) -> String {
    let (name, rating) = match profile {
        Some(p) => (p.name.clone(), format!("{:.1}", p.rating)),
        None => ("A verified artisan".to_string(), "unrated".to_string()),
    };
    format!(
        "🔔 *Good news! We found an available {category}.*\n\n\
         🧑‍🔧 *Personnel:* {name}\n⭐ *Rating:* {rating}/5.0\n✅ *Verified*\n\n\
         Reply *YES* to approve and receive their contact details, or *NO* to cancel."
    )
}

pub fn match_confirmed(provider_identity: &str, support_contact: &str) -> String {
    format!(
        "✅ *Match Confirmed!*\n\nYour artisan is ready. Please call or message them now:\n\
         📞 *Contact:* {provider_identity}\n\n\
         💬 Need help? Chat with customer service for any complaints: {support_contact}"
    )
}

pub fn job_approved(ticket: &JobTicket) -> String {
    format!(
        "✅ *Job #{job_id} Approved!*\n\nThe client is expecting you. Reach out to them \
         immediately to arrange pricing and timing:\n📞 *Client:* {client}\n\
         📍 *Location:* {location}\n📝 *Issue:* {description}\n\n\
         When the job is done, reply *1* (completed) or *2* (cancelled) to close it out.",
        job_id = ticket.job_id,
        client = ticket.client_identity,
        location = ticket.location,
        description = ticket.description,
    )
}

pub fn approval_declined() -> String {
    "❌ Approval cancelled. The job has been aborted. Reply \"menu\" to start a new search."
        .to_string()
}

pub fn approval_unavailable() -> String {
    "This job can no longer be approved. Reply \"menu\" to start a new search.".to_string()
}

pub fn completion_reprompt(job_id: JobId) -> String {
    format!(
        "Please close out job #{job_id} with one of:\n\
         *1* — completed\n*2* — cancelled"
    )
}

pub fn job_no_longer_active() -> String {
    "This job is no longer active. Reply \"menu\" if you need anything else.".to_string()
}

pub fn report_received(job_id: JobId) -> String {
    format!(
        "Thanks — your report on job #{job_id} is in. We are asking the client to confirm. \
         You are now available for new jobs."
    )
}

pub fn verification_prompt(job_id: JobId, reported: ReportedOutcome) -> String {
    let verb = match reported {
        ReportedOutcome::Completed => "completed",
        ReportedOutcome::Cancelled => "cancelled",
    };
    format!(
        "🔔 Your artisan reports job #{job_id} as *{verb}*.\n\n\
         Reply *1* to confirm, or *2* to dispute this report."
    )
}

pub fn verification_recorded(reported: ReportedOutcome) -> String {
    match reported {
        ReportedOutcome::Completed => {
            "✅ Confirmed — job closed as completed. Reply \"menu\" anytime for a new request."
                .to_string()
        }
        ReportedOutcome::Cancelled => {
            "✅ Confirmed — job closed as cancelled. Reply \"menu\" anytime for a new request."
                .to_string()
        }
    }
}

pub fn dispute_received(support_contact: &str) -> String {
    format!(
        "⚠️ Your dispute has been recorded. A human agent will follow up shortly.\n\
         💬 Customer service: {support_contact}"
    )
}

pub fn system_error() -> String {
    "⚠️ The system encountered an error. Please reply \"menu\" to restart.".to_string()
}
