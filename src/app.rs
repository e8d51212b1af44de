//! Wiring of stores, services, validators and use cases

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    ActivityCalendarService, ActivityEvidenceService, ActivityService, CalendarFactory,
    MailService, VacationService,
};
use crate::store::JsonStore;
use crate::usecases::{
    ActivityUseCases, AttachmentUseCases, CalendarUseCases, EvidenceReminderUseCase,
    ImputableOrganizationsUseCase, ProjectRoleUseCases, UsersRetrievalUseCase, VacationUseCases,
};
use crate::validators::{ActivityValidator, VacationValidator};

/// Every use case, sharing one store
pub struct App {
    pub activities: ActivityUseCases,
    pub project_roles: ProjectRoleUseCases,
    pub vacations: VacationUseCases,
    pub calendar: CalendarUseCases,
    pub attachments: AttachmentUseCases,
    pub reminders: EvidenceReminderUseCase,
    pub organizations: ImputableOrganizationsUseCase,
    pub users: UsersRetrievalUseCase,
    store: Arc<JsonStore>,
}

impl App {
    pub fn new(store: Arc<JsonStore>, config: &Config, mail_service: Arc<dyn MailService>) -> Self {
        let calendar_factory = CalendarFactory::new(store.clone());
        let evidence_service = Arc::new(ActivityEvidenceService::new(
            store.clone(),
            config.supported_mime_types.clone(),
        ));
        let activity_service = Arc::new(ActivityService::new(store.clone(), evidence_service));
        let calendar_service = Arc::new(ActivityCalendarService::new(
            calendar_factory.clone(),
            store.clone(),
        ));
        let vacation_service = Arc::new(VacationService::new(
            store.clone(),
            calendar_factory.clone(),
            config.vacation_days_per_year,
        ));

        let activity_validator = ActivityValidator::new(
            activity_service.clone(),
            calendar_service.clone(),
            store.clone(),
        );
        let vacation_validator = VacationValidator::new(store.clone(), vacation_service.clone());

        App {
            activities: ActivityUseCases::new(
                activity_service.clone(),
                calendar_service.clone(),
                activity_validator,
                store.clone(),
                store.clone(),
                mail_service.clone(),
            ),
            project_roles: ProjectRoleUseCases::new(
                activity_service.clone(),
                calendar_service,
                store.clone(),
            ),
            vacations: VacationUseCases::new(
                vacation_service,
                vacation_validator,
                store.clone(),
                store.clone(),
                mail_service.clone(),
            ),
            calendar: CalendarUseCases::new(calendar_factory),
            attachments: AttachmentUseCases::new(
                store.clone(),
                store.clone(),
                config.supported_mime_types.clone(),
                config.temporary_attachment_ttl_hours,
            ),
            reminders: EvidenceReminderUseCase::new(activity_service, store.clone(), mail_service),
            organizations: ImputableOrganizationsUseCase::new(
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            users: UsersRetrievalUseCase::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<JsonStore> {
        &self.store
    }
}
