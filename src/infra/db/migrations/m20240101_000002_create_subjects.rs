//! Migration: subjects and the prerequisite edge table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_accounts::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subjects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Subjects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Subjects::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Subjects::Code).string_len(20).not_null().unique_key())
                    .col(ColumnDef::new(Subjects::Credits).integer().not_null())
                    .col(ColumnDef::new(Subjects::InstructorId).uuid().null())
                    .col(
                        ColumnDef::new(Subjects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Subjects::Credits).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subjects_instructor")
                            .from(Subjects::Table, Subjects::InstructorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubjectPrerequisites::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SubjectPrerequisites::SubjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(SubjectPrerequisites::PrerequisiteId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SubjectPrerequisites::SubjectId)
                            .col(SubjectPrerequisites::PrerequisiteId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prerequisites_subject")
                            .from(SubjectPrerequisites::Table, SubjectPrerequisites::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prerequisites_required")
                            .from(
                                SubjectPrerequisites::Table,
                                SubjectPrerequisites::PrerequisiteId,
                            )
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subjects_instructor")
                    .table(Subjects::Table)
                    .col(Subjects::InstructorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubjectPrerequisites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subjects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(super) enum Subjects {
    Table,
    Id,
    Name,
    Code,
    Credits,
    InstructorId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SubjectPrerequisites {
    Table,
    SubjectId,
    PrerequisiteId,
}
